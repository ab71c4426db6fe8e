//! Argument templates, one per operation (after `-hide_banner -nostdin -y|-n`,
//! before the output path):
//!
//! | Operation    | Template                                             |
//! |--------------|------------------------------------------------------|
//! | Convert      | `-i IN [-vf scale=W:H] [-r FPS] -c:v V -c:a A`       |
//! | Scale        | `-i IN -vf scale=W:H -c:v V -c:a A`                  |
//! | Compress     | `-i IN -c:v V (-b:v RATE | -crf N) -c:a A`           |
//! | ExtractAudio | `-i IN -vn -c:a A [-b:a RATE]`                       |
//! | RemoveAudio  | `-i IN -c:v V -an`                                   |
//! | Trim         | `-ss START -i IN -t DURATION -c:v V -c:a A`          |
//! | Thumbnail    | `-ss START -i IN -frames:v 1 [-vf scale=W:H]`        |
//! | Overlay      | `-i IN -i SRC -filter_complex overlay=X:Y -c:a A`    |

use super::Argv;
use crate::error::{AiclipError, AiclipResult};
use crate::model::{
    Defaults, Dimensions, Operation, ParamKey, ParamValue, Params, Position, ResolvedPath,
};
use crate::security::{Flag, CRF, DURATION_MS, FPS, QUALITY, START_MS};

pub(super) fn fill(
    op: Operation,
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    match op {
        Operation::Convert => convert(argv, input, params, defaults),
        Operation::Scale => scale(argv, input, params, defaults),
        Operation::Compress => compress(argv, input, params, defaults),
        Operation::ExtractAudio => extract_audio(argv, input, params, defaults),
        Operation::RemoveAudio => remove_audio(argv, input, params, defaults),
        Operation::Trim => trim(argv, input, params, defaults),
        Operation::Thumbnail => thumbnail(argv, input, params),
        Operation::Overlay => overlay(argv, input, params, defaults),
    }
}

fn convert(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    input_file(argv, input)?;
    if let Some(dims) = dimensions(params) {
        let filter = argv.validator().scale_filter(dims)?;
        argv.option(Flag::VideoFilter, filter);
    }
    if let Some(fps) = integer(params, ParamKey::Fps) {
        let rate = argv.validator().number(ParamKey::Fps, fps, FPS)?;
        argv.option(Flag::FrameRate, rate);
    }
    video_codec(argv, params, &defaults.video_codec)?;
    audio_codec(argv, params, &defaults.audio_codec)
}

fn scale(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    let dims = dimensions(params).ok_or_else(|| missing(Operation::Scale, ParamKey::Scale))?;
    input_file(argv, input)?;
    let filter = argv.validator().scale_filter(dims)?;
    argv.option(Flag::VideoFilter, filter);
    video_codec(argv, params, &defaults.video_codec)?;
    audio_codec(argv, params, &defaults.passthrough_audio_codec)
}

/// Rate control precedence: bitrate, then crf, then quality mapped to crf, then the default crf.
fn compress(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    input_file(argv, input)?;
    video_codec(argv, params, &defaults.compress_video_codec)?;
    // Every rate parameter is range-checked, including the ones precedence discards.
    let crf = integer(params, ParamKey::Crf)
        .map(|crf| argv.validator().number(ParamKey::Crf, crf, CRF))
        .transpose()?;
    let quality = integer(params, ParamKey::Quality)
        .map(|quality| {
            argv.validator()
                .number(ParamKey::Quality, quality, QUALITY)
                .map(|_| quality)
        })
        .transpose()?;
    if let Some(rate) = text(params, ParamKey::Bitrate) {
        let token = argv.validator().bitrate(ParamKey::Bitrate, rate)?;
        argv.option(Flag::VideoBitrate, token);
    } else {
        let token = match (crf, quality) {
            (Some(token), _) => token,
            (None, Some(quality)) => {
                argv.validator()
                    .number(ParamKey::Crf, quality_to_crf(quality), CRF)?
            }
            (None, None) => argv
                .validator()
                .number(ParamKey::Crf, defaults.compress_crf, CRF)?,
        };
        argv.option(Flag::Crf, token);
    }
    audio_codec(argv, params, &defaults.audio_codec)
}

fn extract_audio(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    input_file(argv, input)?;
    argv.flag(Flag::NoVideo);
    audio_codec(argv, params, &defaults.extract_audio_codec)?;
    if let Some(rate) = text(params, ParamKey::AudioBitrate) {
        let token = argv.validator().bitrate(ParamKey::AudioBitrate, rate)?;
        argv.option(Flag::AudioBitrate, token);
    }
    Ok(())
}

fn remove_audio(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    input_file(argv, input)?;
    video_codec(argv, params, &defaults.passthrough_video_codec)?;
    argv.flag(Flag::NoAudio);
    Ok(())
}

fn trim(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    let start = time(params, ParamKey::Start).unwrap_or(0);
    let duration = trim_duration(start, params)?;
    let start = argv.validator().seconds(ParamKey::Start, start, START_MS)?;
    let duration = argv.validator().seconds(ParamKey::Duration, duration, DURATION_MS)?;
    argv.option(Flag::Seek, start);
    input_file(argv, input)?;
    argv.option(Flag::Duration, duration);
    video_codec(argv, params, &defaults.passthrough_video_codec)?;
    audio_codec(argv, params, &defaults.passthrough_audio_codec)
}

fn thumbnail(argv: &mut Argv<'_>, input: &ResolvedPath, params: &Params) -> AiclipResult<()> {
    let start = time(params, ParamKey::Start).unwrap_or(0);
    let start = argv.validator().seconds(ParamKey::Start, start, START_MS)?;
    argv.option(Flag::Seek, start);
    input_file(argv, input)?;
    let frames = argv.validator().count(1);
    argv.option(Flag::VideoFrames, frames);
    if let Some(dims) = dimensions(params) {
        let filter = argv.validator().scale_filter(dims)?;
        argv.option(Flag::VideoFilter, filter);
    }
    Ok(())
}

fn overlay(
    argv: &mut Argv<'_>,
    input: &ResolvedPath,
    params: &Params,
    defaults: &Defaults,
) -> AiclipResult<()> {
    let Some(ParamValue::Source(src)) = params.get(&ParamKey::Overlay) else {
        return Err(missing(Operation::Overlay, ParamKey::Overlay));
    };
    let position = position(params).unwrap_or(defaults.overlay_position);
    input_file(argv, input)?;
    input_file(argv, src)?;
    let filter = argv.validator().overlay_filter(position)?;
    argv.option(Flag::FilterComplex, filter);
    audio_codec(argv, params, &defaults.passthrough_audio_codec)
}

/// Map a 0..=100 quality (higher is better) onto the 0..=51 crf scale, rounding half up.
pub(crate) fn quality_to_crf(quality: u32) -> u32 {
    let quality = quality.min(100);
    (51 * (100 - quality) + 50) / 100
}

fn trim_duration(start: u64, params: &Params) -> AiclipResult<u64> {
    match (time(params, ParamKey::Duration), time(params, ParamKey::End)) {
        (Some(_), Some(_)) => Err(AiclipError::invalid_parameter(
            ParamKey::End.as_str(),
            "give either duration or end, not both",
            "one of duration or end",
        )),
        (Some(duration), None) => Ok(duration),
        (None, Some(end)) => {
            if end <= start {
                return Err(AiclipError::invalid_parameter(
                    ParamKey::End.as_str(),
                    format!("end ({end} ms) must be after start ({start} ms)"),
                    "end > start",
                ));
            }
            Ok(end - start)
        }
        (None, None) => Err(missing(Operation::Trim, ParamKey::Duration)),
    }
}

fn input_file(argv: &mut Argv<'_>, input: &ResolvedPath) -> AiclipResult<()> {
    argv.flag(Flag::Input);
    argv.path(input.path())
}

fn video_codec(argv: &mut Argv<'_>, params: &Params, default: &str) -> AiclipResult<()> {
    let codec = text(params, ParamKey::VideoCodec).unwrap_or(default);
    let token = argv.validator().codec(ParamKey::VideoCodec, codec)?;
    argv.option(Flag::VideoCodec, token);
    Ok(())
}

fn audio_codec(argv: &mut Argv<'_>, params: &Params, default: &str) -> AiclipResult<()> {
    let codec = text(params, ParamKey::AudioCodec).unwrap_or(default);
    let token = argv.validator().codec(ParamKey::AudioCodec, codec)?;
    argv.option(Flag::AudioCodec, token);
    Ok(())
}

fn missing(op: Operation, key: ParamKey) -> AiclipError {
    AiclipError::unbuildable(
        format!("{op} requires '{key}'"),
        serde_json::json!({
            "operation": op.as_str(),
            "parameter": key.as_str(),
            "fix": format!("Provide a value for {key}"),
        }),
    )
}

fn time(params: &Params, key: ParamKey) -> Option<u64> {
    match params.get(&key) {
        Some(ParamValue::Time(ms)) => Some(*ms),
        _ => None,
    }
}

fn integer(params: &Params, key: ParamKey) -> Option<u32> {
    match params.get(&key) {
        Some(ParamValue::Integer(value)) => Some(*value),
        _ => None,
    }
}

fn text(params: &Params, key: ParamKey) -> Option<&str> {
    match params.get(&key) {
        Some(ParamValue::Codec(value) | ParamValue::Bitrate(value)) => Some(value.as_str()),
        _ => None,
    }
}

fn dimensions(params: &Params) -> Option<Dimensions> {
    match params.get(&ParamKey::Scale) {
        Some(ParamValue::Dimensions(dims)) => Some(*dims),
        _ => None,
    }
}

fn position(params: &Params) -> Option<Position> {
    match params.get(&ParamKey::Position) {
        Some(ParamValue::Position(position)) => Some(*position),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_maps_onto_crf_scale() {
        assert_eq!(quality_to_crf(100), 0);
        assert_eq!(quality_to_crf(0), 51);
        assert_eq!(quality_to_crf(50), 26);
        assert_eq!(quality_to_crf(80), 10);
    }
}
