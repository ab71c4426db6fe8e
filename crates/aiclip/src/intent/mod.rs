//! Intent compilation: the interpreter's structured JSON reply into an
//! [`ActionDescriptor`].
//!
//! The interpreter itself is a black box. Its reply is treated as untrusted
//! input: unknown fields are rejected, raw filter and flag strings are never
//! forwarded, and every path goes through the [`PathResolver`].

pub mod parse;

use crate::error::{AiclipError, AiclipResult};
use crate::model::{
    ActionDescriptor, ActionKind, Defaults, Operation, Output, ParamKey, ParamValue, Params,
};
use crate::resolve::PathResolver;
use crate::security::{display_safe, sanitize_message};
use serde::{Deserialize, Serialize};

/// A string or a list of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(value) => value.trim().is_empty(),
            OneOrMany::Many(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }
}

/// A time given either as a JSON number of seconds or as text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(serde_json::Number),
    Text(String),
}

impl TimeValue {
    fn to_millis(&self, param: ParamKey) -> AiclipResult<u64> {
        match self {
            TimeValue::Seconds(number) => parse::parse_time(param.as_str(), &number.to_string()),
            TimeValue::Text(text) => parse::parse_time(param.as_str(), text),
        }
    }
}

/// The interpreter's reply, field for field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Intent {
    pub action: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub output: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub filters: Option<OneOrMany>,
    pub start: Option<TimeValue>,
    pub end: Option<TimeValue>,
    pub duration: Option<TimeValue>,
    pub scale: Option<String>,
    pub bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    pub crf: Option<i64>,
    pub quality: Option<i64>,
    pub fps: Option<i64>,
    pub overlay_path: Option<String>,
    pub overlay_xy: Option<String>,
    pub glob: Option<String>,
    pub output_dir: Option<String>,
    pub extra_flags: Option<OneOrMany>,
}

impl Intent {
    /// Parse an interpreter reply.
    ///
    /// An `{"error": ...}` reply becomes `InvalidParameter` carrying the
    /// interpreter's sanitized message.
    pub fn from_json(text: &str) -> AiclipResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|err| {
            AiclipError::invalid_parameter(
                "intent",
                format!("not valid JSON: {}", sanitize_message(&err.to_string())),
                "a JSON object matching the intent schema",
            )
        })?;
        if let Some(error) = value.get("error") {
            let kind = error.as_str().unwrap_or("error");
            let message = value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("no message");
            return Err(AiclipError::invalid_parameter(
                "intent",
                format!(
                    "interpreter declined the request ({}): {}",
                    display_safe(&sanitize_message(kind)),
                    display_safe(&sanitize_message(message))
                ),
                "a supported media operation",
            ));
        }
        serde_json::from_value(value).map_err(|err| {
            AiclipError::invalid_parameter(
                "intent",
                sanitize_message(&err.to_string()),
                "a JSON object matching the intent schema",
            )
        })
    }

    /// Resolve the action kind. `batch_<op>` or a glob selects batch mode.
    pub fn kind(&self) -> AiclipResult<ActionKind> {
        let action = self.action.trim().to_ascii_lowercase();
        let (batch, name) = match action.strip_prefix("batch_") {
            Some(name) => (true, name),
            None => (false, action.as_str()),
        };
        let op = parse_operation(name).ok_or_else(|| {
            let valid: Vec<&str> = Operation::ALL.iter().map(|op| op.as_str()).collect();
            AiclipError::invalid_parameter(
                "action",
                format!("unsupported action '{}'", display_safe(&self.action)),
                valid.join(", "),
            )
        })?;
        if batch || self.glob.is_some() {
            Ok(ActionKind::Batch(op))
        } else {
            Ok(ActionKind::Single(op))
        }
    }

    /// Resolve paths and parameters into a validated descriptor.
    pub fn compile(&self, resolver: &PathResolver, defaults: &Defaults) -> AiclipResult<ActionDescriptor> {
        self.reject_raw_arguments()?;
        let kind = self.kind()?;

        let mut expressions: Vec<&str> = self.inputs.iter().map(String::as_str).collect();
        if let Some(glob) = &self.glob {
            expressions.push(glob);
        }
        let inputs = resolver.resolve_inputs(&expressions)?;
        let output_dir = self
            .output_dir
            .as_deref()
            .map(|dir| resolver.resolve_output_dir(dir))
            .transpose()?;

        let output = match kind {
            ActionKind::Batch(op) => {
                if self.output.is_some() {
                    return Err(AiclipError::invalid_parameter(
                        "output",
                        "a batch derives one output per input",
                        "omit output; use output_dir to choose the directory",
                    ));
                }
                Output::PerInput(resolver.batch_outputs(op, &inputs, output_dir.as_deref(), defaults)?)
            }
            ActionKind::Single(op) => {
                let Some(primary) = inputs.first() else {
                    return Err(AiclipError::path_resolution("no input files were given", None));
                };
                match &self.output {
                    Some(requested) => Output::File(resolver.resolve_output(requested)?),
                    None => Output::File(resolver.default_output(
                        op,
                        primary,
                        output_dir.as_deref(),
                        defaults,
                    )?),
                }
            }
        };

        let params = self.params(resolver)?;
        let descriptor = ActionDescriptor::new(kind, inputs, output, params)?;
        tracing::debug!(
            operation = %descriptor.operation(),
            batch = kind.is_batch(),
            inputs = descriptor.inputs().len(),
            params = descriptor.params().len(),
            "compiled intent"
        );
        Ok(descriptor)
    }

    fn reject_raw_arguments(&self) -> AiclipResult<()> {
        for (name, value) in [("filters", &self.filters), ("extra_flags", &self.extra_flags)] {
            if value.as_ref().is_some_and(|value| !value.is_empty()) {
                return Err(AiclipError::invalid_parameter(
                    name,
                    "raw tool arguments are never forwarded",
                    "empty; use the typed fields such as scale, fps or crf",
                ));
            }
        }
        Ok(())
    }

    fn params(&self, resolver: &PathResolver) -> AiclipResult<Params> {
        let mut params = Params::new();
        let times = [
            (ParamKey::Start, &self.start),
            (ParamKey::End, &self.end),
            (ParamKey::Duration, &self.duration),
        ];
        for (key, value) in times {
            if let Some(value) = value {
                params.insert(key, ParamValue::Time(value.to_millis(key)?));
            }
        }
        if let Some(scale) = &self.scale {
            params.insert(ParamKey::Scale, ParamValue::Dimensions(parse::parse_scale(scale)?));
        }
        let integers = [
            (ParamKey::Quality, self.quality, "[0,100]"),
            (ParamKey::Crf, self.crf, "[0,51]"),
            (ParamKey::Fps, self.fps, "[1,240]"),
        ];
        for (key, value, range) in integers {
            if let Some(value) = value {
                params.insert(key, ParamValue::Integer(to_u32(key, value, range)?));
            }
        }
        let texts = [
            (ParamKey::VideoCodec, &self.video_codec, false),
            (ParamKey::AudioCodec, &self.audio_codec, false),
            (ParamKey::Bitrate, &self.bitrate, true),
            (ParamKey::AudioBitrate, &self.audio_bitrate, true),
        ];
        for (key, value, is_bitrate) in texts {
            if let Some(value) = value {
                let value = value.trim().to_string();
                let value = if is_bitrate {
                    ParamValue::Bitrate(value)
                } else {
                    ParamValue::Codec(value)
                };
                params.insert(key, value);
            }
        }
        if let Some(path) = &self.overlay_path {
            params.insert(
                ParamKey::Overlay,
                ParamValue::Source(resolver.resolve_single_input(path)?),
            );
        }
        if let Some(xy) = &self.overlay_xy {
            params.insert(ParamKey::Position, ParamValue::Position(parse::parse_position(xy)?));
        }
        Ok(params)
    }
}

fn parse_operation(name: &str) -> Option<Operation> {
    match name {
        "format_convert" | "transcode" => Some(Operation::Convert),
        "resize" => Some(Operation::Scale),
        "segment" | "cut" => Some(Operation::Trim),
        "mute" => Some(Operation::RemoveAudio),
        other => Operation::parse(other),
    }
}

fn to_u32(key: ParamKey, value: i64, range: &str) -> AiclipResult<u32> {
    u32::try_from(value)
        .map_err(|_| AiclipError::invalid_parameter(key.as_str(), format!("{value} is out of range"), range))
}
