use super::{display_safe, SafeToken, Validator};
use crate::error::{AiclipError, AiclipResult};
use crate::model::{Dimensions, ParamKey, Position};

/// Characters a shell would interpret. Never allowed in a token or path.
pub const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '`', '>', '<', '\n'];

const FREE_TEXT_PUNCTUATION: &[char] = &['-', '_', '.', ':', '+', ',', '=', '/', '@', '%'];
const MAX_FREE_TEXT_LEN: usize = 64;
const BITRATE_PATTERN: &str = r"^([0-9]+)([kKmM]?)$";

/// Inclusive numeric bounds with the wording used in rejections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: u64,
    pub max: u64,
    pub label: &'static str,
}

impl Bounds {
    #[must_use]
    pub fn contains(self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const QUALITY: Bounds = Bounds {
    min: 0,
    max: 100,
    label: "[0,100]",
};
pub const CRF: Bounds = Bounds {
    min: 0,
    max: 51,
    label: "[0,51]",
};
pub const FPS: Bounds = Bounds {
    min: 1,
    max: 240,
    label: "[1,240]",
};
pub const DIMENSION: Bounds = Bounds {
    min: 2,
    max: 8192,
    label: "[2,8192]",
};
pub const OFFSET: Bounds = Bounds {
    min: 0,
    max: 8192,
    label: "[0,8192]",
};
pub const START_MS: Bounds = Bounds {
    min: 0,
    max: 86_400_000,
    label: "[0,86400000] ms",
};
pub const DURATION_MS: Bounds = Bounds {
    min: 1,
    max: 86_400_000,
    label: "(0,86400000] ms",
};
pub const BITRATE_BITS: Bounds = Bounds {
    min: 1_000,
    max: 100_000_000,
    label: "1k..=100M",
};

/// The fixed vocabulary of tool options a plan may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    HideBanner,
    NoStdin,
    Overwrite,
    NoOverwrite,
    Input,
    Seek,
    Duration,
    VideoFilter,
    FilterComplex,
    FrameRate,
    VideoCodec,
    AudioCodec,
    VideoBitrate,
    AudioBitrate,
    Crf,
    NoVideo,
    NoAudio,
    VideoFrames,
}

impl Flag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Flag::HideBanner => "-hide_banner",
            Flag::NoStdin => "-nostdin",
            Flag::Overwrite => "-y",
            Flag::NoOverwrite => "-n",
            Flag::Input => "-i",
            Flag::Seek => "-ss",
            Flag::Duration => "-t",
            Flag::VideoFilter => "-vf",
            Flag::FilterComplex => "-filter_complex",
            Flag::FrameRate => "-r",
            Flag::VideoCodec => "-c:v",
            Flag::AudioCodec => "-c:a",
            Flag::VideoBitrate => "-b:v",
            Flag::AudioBitrate => "-b:a",
            Flag::Crf => "-crf",
            Flag::NoVideo => "-vn",
            Flag::NoAudio => "-an",
            Flag::VideoFrames => "-frames:v",
        }
    }

    #[must_use]
    pub fn token(self) -> SafeToken {
        SafeToken::mint(self.as_str())
    }
}

// Minting goes through the validator so callers need one in hand.
#[allow(clippy::unused_self)]
impl Validator {
    /// Check a free-text value against the token allowlist.
    pub fn check_free_text(&self, param: &str, value: &str) -> AiclipResult<()> {
        const VALID: &str = "ASCII letters, digits and - _ . : + , = / @ %, not starting with -";
        if value.is_empty() {
            return Err(AiclipError::invalid_parameter(param, "value is empty", VALID));
        }
        if value.len() > MAX_FREE_TEXT_LEN {
            return Err(AiclipError::invalid_parameter(
                param,
                format!("value is longer than {MAX_FREE_TEXT_LEN} characters"),
                VALID,
            ));
        }
        if let Some(bad) = value.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return Err(AiclipError::invalid_parameter(
                param,
                format!(
                    "'{}' contains shell metacharacter '{}'",
                    display_safe(value),
                    display_safe(&bad.to_string())
                ),
                VALID,
            ));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !FREE_TEXT_PUNCTUATION.contains(c))
        {
            return Err(AiclipError::invalid_parameter(
                param,
                format!(
                    "'{}' contains disallowed character '{}'",
                    display_safe(value),
                    display_safe(&bad.to_string())
                ),
                VALID,
            ));
        }
        if value.starts_with('-') {
            return Err(AiclipError::invalid_parameter(
                param,
                format!("'{}' would be read as an option", display_safe(value)),
                VALID,
            ));
        }
        Ok(())
    }

    /// Mint a codec name token.
    pub fn codec(&self, param: ParamKey, value: &str) -> AiclipResult<SafeToken> {
        self.check_free_text(param.as_str(), value)?;
        Ok(SafeToken::mint(value))
    }

    /// Mint a bitrate token such as `800k` or `2M`, bounded by [`BITRATE_BITS`].
    pub fn bitrate(&self, param: ParamKey, value: &str) -> AiclipResult<SafeToken> {
        self.check_free_text(param.as_str(), value)?;
        let bits = parse_bitrate(value).ok_or_else(|| {
            AiclipError::invalid_parameter(
                param.as_str(),
                format!("'{}' is not a bitrate", display_safe(value)),
                BITRATE_BITS.label,
            )
        })?;
        if !BITRATE_BITS.contains(bits) {
            return Err(AiclipError::invalid_parameter(
                param.as_str(),
                format!("{value} is out of range"),
                BITRATE_BITS.label,
            ));
        }
        Ok(SafeToken::mint(value))
    }

    /// Mint a range-checked integer token.
    pub fn number(&self, param: ParamKey, value: u32, bounds: Bounds) -> AiclipResult<SafeToken> {
        check_bounds(param.as_str(), u64::from(value), bounds)?;
        Ok(SafeToken::mint(value.to_string()))
    }

    /// Mint a range-checked time token, rendered in seconds.
    pub fn seconds(&self, param: ParamKey, ms: u64, bounds: Bounds) -> AiclipResult<SafeToken> {
        check_bounds(param.as_str(), ms, bounds)?;
        Ok(SafeToken::mint(format_seconds(ms)))
    }

    /// Mint a fixed count. Unsigned integers cannot carry metacharacters.
    #[must_use]
    pub fn count(&self, value: u32) -> SafeToken {
        SafeToken::mint(value.to_string())
    }

    /// Mint a `scale=W:H` filter. A missing side becomes `-2`, keeping the aspect ratio
    /// with an even size.
    pub fn scale_filter(&self, dims: Dimensions) -> AiclipResult<SafeToken> {
        if dims.width.is_none() && dims.height.is_none() {
            return Err(AiclipError::invalid_parameter(
                ParamKey::Scale.as_str(),
                "at least one side must be given",
                "W:H with W,H in [2,8192], or -1/-2 for one side",
            ));
        }
        let side = |value: Option<u32>| -> AiclipResult<String> {
            match value {
                Some(px) => {
                    check_bounds(ParamKey::Scale.as_str(), u64::from(px), DIMENSION)?;
                    Ok(px.to_string())
                }
                None => Ok("-2".to_string()),
            }
        };
        let width = side(dims.width)?;
        let height = side(dims.height)?;
        Ok(SafeToken::mint(format!("scale={width}:{height}")))
    }

    /// Mint an `overlay=X:Y` filter.
    pub fn overlay_filter(&self, position: Position) -> AiclipResult<SafeToken> {
        check_bounds(ParamKey::Position.as_str(), u64::from(position.x), OFFSET)?;
        check_bounds(ParamKey::Position.as_str(), u64::from(position.y), OFFSET)?;
        Ok(SafeToken::mint(format!(
            "overlay={}:{}",
            position.x, position.y
        )))
    }
}

fn check_bounds(param: &str, value: u64, bounds: Bounds) -> AiclipResult<()> {
    if bounds.contains(value) {
        Ok(())
    } else {
        Err(AiclipError::invalid_parameter(
            param,
            format!("{value} is out of range"),
            bounds.label,
        ))
    }
}

fn parse_bitrate(value: &str) -> Option<u64> {
    let re = regex::Regex::new(BITRATE_PATTERN).ok()?;
    let caps = re.captures(value)?;
    let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("k" | "K") => 1_000,
        Some("m" | "M") => 1_000_000,
        _ => 1,
    };
    amount.checked_mul(multiplier)
}

/// Render milliseconds as seconds, dropping a zero fraction (`30000` is `30`, `1500` is `1.5`).
pub(crate) fn format_seconds(ms: u64) -> String {
    let secs = ms / 1000;
    let frac = ms % 1000;
    if frac == 0 {
        return secs.to_string();
    }
    let frac = format!("{frac:03}");
    format!("{secs}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn validator() -> Validator {
        Validator::new(Vec::new())
    }

    #[test]
    fn seconds_render_without_trailing_zeros() {
        assert_eq!(format_seconds(0), "0");
        assert_eq!(format_seconds(30_000), "30");
        assert_eq!(format_seconds(1_500), "1.5");
        assert_eq!(format_seconds(61_250), "61.25");
        assert_eq!(format_seconds(7), "0.007");
    }

    #[test]
    fn bitrate_suffixes_scale_the_value() {
        assert_eq!(parse_bitrate("800k"), Some(800_000));
        assert_eq!(parse_bitrate("2M"), Some(2_000_000));
        assert_eq!(parse_bitrate("128000"), Some(128_000));
        assert_eq!(parse_bitrate("2G"), None);
    }

    #[test]
    fn bitrate_outside_bounds_is_rejected() {
        let err = validator().bitrate(ParamKey::Bitrate, "500M").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert!(err.message.contains("1k..=100M"));
        assert!(validator().bitrate(ParamKey::Bitrate, "999").is_err());
        assert_eq!(
            validator().bitrate(ParamKey::Bitrate, "1k").unwrap().as_str(),
            "1k"
        );
    }

    #[test]
    fn codec_rejects_option_injection() {
        let err = validator().codec(ParamKey::VideoCodec, "-f").unwrap_err();
        assert!(err.message.contains("option"));
        assert!(validator().codec(ParamKey::VideoCodec, "libx264").is_ok());
    }

    #[test]
    fn scale_filter_keeps_aspect_for_missing_side() {
        let token = validator()
            .scale_filter(Dimensions {
                width: Some(1280),
                height: None,
            })
            .unwrap();
        assert_eq!(token.as_str(), "scale=1280:-2");
        assert!(validator()
            .scale_filter(Dimensions {
                width: None,
                height: None
            })
            .is_err());
        assert!(validator().scale_filter(Dimensions::new(1, 720)).is_err());
    }

    #[test]
    fn numbers_are_range_checked() {
        let err = validator().number(ParamKey::Crf, 52, CRF).unwrap_err();
        assert!(err.message.contains("crf"));
        assert!(err.message.contains("[0,51]"));
        assert_eq!(validator().number(ParamKey::Fps, 30, FPS).unwrap().as_str(), "30");
    }
}
