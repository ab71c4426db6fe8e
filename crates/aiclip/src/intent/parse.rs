//! Parsers for the loosely formatted values an interpreter emits.

use crate::error::{AiclipError, AiclipResult};
use crate::model::{Dimensions, Position};
use crate::security::display_safe;

const TIME_FORMATS: &str = "SS, SS.mmm, MM:SS, HH:MM:SS(.mmm) or a number with an s suffix";
const SCALE_FORMATS: &str =
    "W:H or WxH (-1/-2 keeps aspect), or 480p, 720p, 1080p, 1440p, 2160p, 4k";
const POSITION_FORMATS: &str = "X:Y with non-negative integers";

/// Parse a time expression into milliseconds.
pub fn parse_time(param: &str, text: &str) -> AiclipResult<u64> {
    let invalid = || {
        AiclipError::invalid_parameter(
            param,
            format!("'{}' is not a time", display_safe(text)),
            TIME_FORMATS,
        )
    };
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('s').unwrap_or(trimmed);
    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [secs] => (0, 0, *secs),
        [mins, secs] => (0, parse_whole(mins).ok_or_else(invalid)?, *secs),
        [hours, mins, secs] => {
            let mins = parse_whole(mins).ok_or_else(invalid)?;
            if mins >= 60 {
                return Err(invalid());
            }
            (parse_whole(hours).ok_or_else(invalid)?, mins, *secs)
        }
        _ => return Err(invalid()),
    };
    let seconds_ms = parse_seconds(seconds).ok_or_else(invalid)?;
    if parts.len() > 1 && seconds_ms >= 60_000 {
        return Err(invalid());
    }
    hours
        .checked_mul(3_600_000)
        .and_then(|h| minutes.checked_mul(60_000).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds_ms))
        .ok_or_else(invalid)
}

/// Parse `SS` or `SS.fff` into milliseconds. Digits past the third decimal are dropped.
fn parse_seconds(text: &str) -> Option<u64> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };
    let whole = parse_whole(whole)?;
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let millis: String = fraction.chars().chain("000".chars()).take(3).collect();
    let millis: u64 = millis.parse().ok()?;
    whole.checked_mul(1000)?.checked_add(millis)
}

fn parse_whole(text: &str) -> Option<u64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse a scale expression or preset.
pub fn parse_scale(text: &str) -> AiclipResult<Dimensions> {
    let invalid = || {
        AiclipError::invalid_parameter(
            "scale",
            format!("'{}' is not a frame size", display_safe(text)),
            SCALE_FORMATS,
        )
    };
    let lowered = text.trim().to_ascii_lowercase();
    let preset = match lowered.as_str() {
        "480p" => Some(Dimensions::new(854, 480)),
        "720p" => Some(Dimensions::new(1280, 720)),
        "1080p" => Some(Dimensions::new(1920, 1080)),
        "1440p" => Some(Dimensions::new(2560, 1440)),
        "2160p" | "4k" => Some(Dimensions::new(3840, 2160)),
        _ => None,
    };
    if let Some(dims) = preset {
        return Ok(dims);
    }
    let body = lowered.strip_prefix("scale=").unwrap_or(&lowered);
    let (width, height) = body
        .split_once(':')
        .or_else(|| body.split_once('x'))
        .ok_or_else(invalid)?;
    let side = |value: &str| -> AiclipResult<Option<u32>> {
        match value.trim() {
            "-1" | "-2" => Ok(None),
            digits => digits.parse::<u32>().map(Some).map_err(|_| invalid()),
        }
    };
    let dims = Dimensions {
        width: side(width)?,
        height: side(height)?,
    };
    if dims.width.is_none() && dims.height.is_none() {
        return Err(invalid());
    }
    Ok(dims)
}

/// Parse an overlay position such as `10:10`.
pub fn parse_position(text: &str) -> AiclipResult<Position> {
    let invalid = || {
        AiclipError::invalid_parameter(
            "overlay_xy",
            format!("'{}' is not a position", display_safe(text)),
            POSITION_FORMATS,
        )
    };
    let (x, y) = text
        .trim()
        .split_once(':')
        .or_else(|| text.trim().split_once(','))
        .ok_or_else(invalid)?;
    Ok(Position {
        x: x.trim().parse().map_err(|_| invalid())?,
        y: y.trim().parse().map_err(|_| invalid())?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn time_formats_parse_to_milliseconds() {
        assert_eq!(parse_time("start", "30").unwrap(), 30_000);
        assert_eq!(parse_time("start", "30s").unwrap(), 30_000);
        assert_eq!(parse_time("start", "1.5").unwrap(), 1_500);
        assert_eq!(parse_time("start", "01:30").unwrap(), 90_000);
        assert_eq!(parse_time("start", "01:02:03.250").unwrap(), 3_723_250);
        assert_eq!(parse_time("start", "0").unwrap(), 0);
    }

    #[test]
    fn malformed_times_are_rejected() {
        for bad in ["", "abc", "1:2:3:4", "00:75", "01:60:00", "-5", "1.2.3", "5; rm"] {
            let err = parse_time("start", bad).unwrap_err();
            assert!(err.message.contains("start"), "{bad}");
        }
    }

    #[test]
    fn scale_accepts_presets_and_pairs() {
        assert_eq!(parse_scale("720p").unwrap(), Dimensions::new(1280, 720));
        assert_eq!(parse_scale("4K").unwrap(), Dimensions::new(3840, 2160));
        assert_eq!(parse_scale("640x480").unwrap(), Dimensions::new(640, 480));
        assert_eq!(
            parse_scale("scale=1280:-1").unwrap(),
            Dimensions {
                width: Some(1280),
                height: None
            }
        );
        assert!(parse_scale("-1:-2").is_err());
        assert!(parse_scale("big").is_err());
    }

    #[test]
    fn position_parses_pairs() {
        assert_eq!(parse_position("10:20").unwrap(), Position { x: 10, y: 20 });
        assert_eq!(parse_position("5, 6").unwrap(), Position { x: 5, y: 6 });
        assert!(parse_position("top-left").is_err());
    }
}
