use crate::error::{AiclipError, AiclipResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Operations and Kinds
// =============================================================================

/// A single media operation the builder knows how to express.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Convert,
    Scale,
    Compress,
    ExtractAudio,
    RemoveAudio,
    Trim,
    Thumbnail,
    Overlay,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Convert,
        Operation::Scale,
        Operation::Compress,
        Operation::ExtractAudio,
        Operation::RemoveAudio,
        Operation::Trim,
        Operation::Thumbnail,
        Operation::Overlay,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Convert => "convert",
            Operation::Scale => "scale",
            Operation::Compress => "compress",
            Operation::ExtractAudio => "extract_audio",
            Operation::RemoveAudio => "remove_audio",
            Operation::Trim => "trim",
            Operation::Thumbnail => "thumbnail",
            Operation::Overlay => "overlay",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Parameters this operation accepts. Anything else is rejected.
    #[must_use]
    pub fn recognized_params(self) -> &'static [ParamKey] {
        match self {
            Operation::Convert => &[
                ParamKey::Scale,
                ParamKey::Fps,
                ParamKey::VideoCodec,
                ParamKey::AudioCodec,
            ],
            Operation::Scale => &[ParamKey::Scale, ParamKey::VideoCodec, ParamKey::AudioCodec],
            Operation::Compress => &[
                ParamKey::Quality,
                ParamKey::Crf,
                ParamKey::Bitrate,
                ParamKey::VideoCodec,
                ParamKey::AudioCodec,
            ],
            Operation::ExtractAudio => &[ParamKey::AudioCodec, ParamKey::AudioBitrate],
            Operation::RemoveAudio => &[ParamKey::VideoCodec],
            Operation::Trim => &[
                ParamKey::Start,
                ParamKey::End,
                ParamKey::Duration,
                ParamKey::VideoCodec,
                ParamKey::AudioCodec,
            ],
            Operation::Thumbnail => &[ParamKey::Start, ParamKey::Scale],
            Operation::Overlay => &[ParamKey::Overlay, ParamKey::Position, ParamKey::AudioCodec],
        }
    }

    #[must_use]
    pub fn recognizes(self, key: ParamKey) -> bool {
        self.recognized_params().contains(&key)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a descriptor asks for: one operation on one input, or the same
/// operation applied to every matched input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "operation", rename_all = "snake_case")]
pub enum ActionKind {
    Single(Operation),
    Batch(Operation),
}

impl ActionKind {
    #[must_use]
    pub fn operation(self) -> Operation {
        match self {
            ActionKind::Single(op) | ActionKind::Batch(op) => op,
        }
    }

    #[must_use]
    pub fn is_batch(self) -> bool {
        matches!(self, ActionKind::Batch(_))
    }
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    Start,
    End,
    Duration,
    Scale,
    Quality,
    Crf,
    VideoCodec,
    AudioCodec,
    Bitrate,
    AudioBitrate,
    Fps,
    Overlay,
    Position,
}

impl ParamKey {
    pub const ALL: [ParamKey; 13] = [
        ParamKey::Start,
        ParamKey::End,
        ParamKey::Duration,
        ParamKey::Scale,
        ParamKey::Quality,
        ParamKey::Crf,
        ParamKey::VideoCodec,
        ParamKey::AudioCodec,
        ParamKey::Bitrate,
        ParamKey::AudioBitrate,
        ParamKey::Fps,
        ParamKey::Overlay,
        ParamKey::Position,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKey::Start => "start",
            ParamKey::End => "end",
            ParamKey::Duration => "duration",
            ParamKey::Scale => "scale",
            ParamKey::Quality => "quality",
            ParamKey::Crf => "crf",
            ParamKey::VideoCodec => "video_codec",
            ParamKey::AudioCodec => "audio_codec",
            ParamKey::Bitrate => "bitrate",
            ParamKey::AudioBitrate => "audio_bitrate",
            ParamKey::Fps => "fps",
            ParamKey::Overlay => "overlay",
            ParamKey::Position => "position",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// The value type this key carries.
    #[must_use]
    pub fn expected_type(self) -> ParamType {
        match self {
            ParamKey::Start | ParamKey::End | ParamKey::Duration => ParamType::Time,
            ParamKey::Scale => ParamType::Dimensions,
            ParamKey::Quality | ParamKey::Crf | ParamKey::Fps => ParamType::Integer,
            ParamKey::VideoCodec | ParamKey::AudioCodec => ParamType::Codec,
            ParamKey::Bitrate | ParamKey::AudioBitrate => ParamType::Bitrate,
            ParamKey::Overlay => ParamType::Source,
            ParamKey::Position => ParamType::Position,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Time,
    Dimensions,
    Integer,
    Codec,
    Bitrate,
    Position,
    Source,
}

impl ParamType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Time => "time",
            ParamType::Dimensions => "dimensions",
            ParamType::Integer => "integer",
            ParamType::Codec => "codec name",
            ParamType::Bitrate => "bitrate",
            ParamType::Position => "position",
            ParamType::Source => "source file",
        }
    }
}

/// Output frame size. `None` on a side keeps the aspect ratio for that side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Dimensions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Top-left placement of an overlay, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    /// Milliseconds from the start of the media.
    Time(u64),
    Dimensions(Dimensions),
    Integer(u32),
    Codec(String),
    Bitrate(String),
    Position(Position),
    Source(ResolvedPath),
}

impl ParamValue {
    #[must_use]
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Time(_) => ParamType::Time,
            ParamValue::Dimensions(_) => ParamType::Dimensions,
            ParamValue::Integer(_) => ParamType::Integer,
            ParamValue::Codec(_) => ParamType::Codec,
            ParamValue::Bitrate(_) => ParamType::Bitrate,
            ParamValue::Position(_) => ParamType::Position,
            ParamValue::Source(_) => ParamType::Source,
        }
    }
}

pub type Params = BTreeMap<ParamKey, ParamValue>;

// =============================================================================
// Resolved Paths
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRole {
    Input,
    Output,
}

/// A canonical path that has been verified to lie under an allowed root.
///
/// Only the path resolver can create these, so holding one is proof the
/// path went through scope validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedPath {
    path: PathBuf,
    role: PathRole,
    existed: bool,
}

impl ResolvedPath {
    pub(crate) fn input(path: PathBuf) -> Self {
        Self {
            path,
            role: PathRole::Input,
            existed: true,
        }
    }

    pub(crate) fn output(path: PathBuf, existed: bool) -> Self {
        Self {
            path,
            role: PathRole::Output,
            existed,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn role(&self) -> PathRole {
        self.role
    }

    /// Whether a file already existed at this path when it was resolved.
    #[must_use]
    pub fn existed(&self) -> bool {
        self.existed
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// Action Descriptor
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    File(ResolvedPath),
    PerInput(Vec<ResolvedPath>),
}

/// Canonical, validated description of one requested media operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    kind: ActionKind,
    inputs: Vec<ResolvedPath>,
    output: Output,
    params: Params,
}

impl ActionDescriptor {
    /// Validate shape and parameter keys, then freeze the descriptor.
    ///
    /// Parameter ranges are checked later, when the builder formats tokens.
    pub fn new(
        kind: ActionKind,
        inputs: Vec<ResolvedPath>,
        output: Output,
        params: Params,
    ) -> AiclipResult<Self> {
        validate_shape(kind, &inputs, &output)?;
        validate_params(kind.operation(), &params)?;
        Ok(Self {
            kind,
            inputs,
            output,
            params,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.kind.operation()
    }

    #[must_use]
    pub fn inputs(&self) -> &[ResolvedPath] {
        &self.inputs
    }

    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub fn param(&self, key: ParamKey) -> Option<&ParamValue> {
        self.params.get(&key)
    }
}

fn validate_shape(kind: ActionKind, inputs: &[ResolvedPath], output: &Output) -> AiclipResult<()> {
    if inputs.is_empty() {
        return Err(AiclipError::unbuildable(
            "action requires at least one input file",
            serde_json::json!({ "operation": kind.operation().as_str() }),
        ));
    }
    if let Some(bad) = inputs.iter().find(|p| p.role() != PathRole::Input) {
        return Err(AiclipError::path_resolution(
            "output path supplied where an input was expected",
            serde_json::json!({ "path": bad.path().display().to_string() }),
        ));
    }
    match (kind, output) {
        (ActionKind::Single(op), Output::File(out)) => {
            if inputs.len() != 1 {
                return Err(AiclipError::unbuildable(
                    format!("{op} takes exactly one input; use a batch for several files"),
                    serde_json::json!({ "inputs": inputs.len() }),
                ));
            }
            ensure_output_role(out)
        }
        (ActionKind::Batch(_), Output::PerInput(outs)) => {
            if outs.len() != inputs.len() {
                return Err(AiclipError::unbuildable(
                    "batch needs exactly one output per input",
                    serde_json::json!({ "inputs": inputs.len(), "outputs": outs.len() }),
                ));
            }
            outs.iter().try_for_each(ensure_output_role)
        }
        (ActionKind::Single(_), Output::PerInput(_)) => Err(AiclipError::unbuildable(
            "single action cannot carry per-input outputs",
            None,
        )),
        (ActionKind::Batch(_), Output::File(_)) => Err(AiclipError::unbuildable(
            "batch action requires per-input outputs",
            None,
        )),
    }
}

fn ensure_output_role(path: &ResolvedPath) -> AiclipResult<()> {
    if path.role() == PathRole::Output {
        Ok(())
    } else {
        Err(AiclipError::path_resolution(
            "input path supplied where an output was expected",
            serde_json::json!({ "path": path.path().display().to_string() }),
        ))
    }
}

fn validate_params(op: Operation, params: &Params) -> AiclipResult<()> {
    for (key, value) in params {
        if !op.recognizes(*key) {
            let accepted: Vec<&str> = op.recognized_params().iter().map(|k| k.as_str()).collect();
            return Err(AiclipError::invalid_parameter(
                key.as_str(),
                format!("not recognized by {op}"),
                accepted.join(", "),
            ));
        }
        if value.param_type() != key.expected_type() {
            return Err(AiclipError::invalid_parameter(
                key.as_str(),
                format!("expected {}, got {}", key.expected_type().as_str(), value.param_type().as_str()),
                key.expected_type().as_str(),
            ));
        }
        if let ParamValue::Source(source) = value {
            if source.role() != PathRole::Input {
                return Err(AiclipError::invalid_parameter(
                    key.as_str(),
                    "source must be a resolved input file",
                    "existing file under an allowed root",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn input(name: &str) -> ResolvedPath {
        ResolvedPath::input(PathBuf::from(format!("/media/{name}")))
    }

    fn output(name: &str) -> ResolvedPath {
        ResolvedPath::output(PathBuf::from(format!("/media/{name}")), false)
    }

    #[test]
    fn unknown_parameter_for_kind_is_rejected() {
        let mut params = Params::new();
        params.insert(ParamKey::Quality, ParamValue::Integer(50));
        let err = ActionDescriptor::new(
            ActionKind::Single(Operation::Trim),
            vec![input("a.mp4")],
            Output::File(output("b.mp4")),
            params,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert!(err.message.contains("quality"));
    }

    #[test]
    fn mistyped_parameter_is_rejected() {
        let mut params = Params::new();
        params.insert(ParamKey::Duration, ParamValue::Integer(30));
        let err = ActionDescriptor::new(
            ActionKind::Single(Operation::Trim),
            vec![input("a.mp4")],
            Output::File(output("b.mp4")),
            params,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert!(err.message.contains("expected time"));
    }

    #[test]
    fn batch_requires_one_output_per_input() {
        let err = ActionDescriptor::new(
            ActionKind::Batch(Operation::Convert),
            vec![input("a.mp4"), input("b.mp4")],
            Output::PerInput(vec![output("a_converted.mp4")]),
            Params::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnbuildableAction);
    }

    #[test]
    fn single_rejects_output_in_input_slot() {
        let err = ActionDescriptor::new(
            ActionKind::Single(Operation::Convert),
            vec![output("a.mp4")],
            Output::File(output("b.mp4")),
            Params::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);
    }

    #[test]
    fn operation_names_parse() {
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.as_str()), Some(op));
        }
        for key in ParamKey::ALL {
            assert_eq!(ParamKey::parse(key.as_str()), Some(key));
        }
    }
}
