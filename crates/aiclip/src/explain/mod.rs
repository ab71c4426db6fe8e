//! Plain-language explanation of an ffmpeg argument list.
//!
//! Works on discrete tokens, so option values are never mistaken for options.
//! Nothing here executes anything.

use crate::security::display_safe;
use serde::Serialize;
use std::fmt;

/// Options that consume the following token as their value.
const VALUE_OPTIONS: &[&str] = &[
    "-i",
    "-ss",
    "-t",
    "-to",
    "-vf",
    "-filter:v",
    "-af",
    "-filter_complex",
    "-c:v",
    "-vcodec",
    "-c:a",
    "-acodec",
    "-b:v",
    "-b:a",
    "-crf",
    "-r",
    "-frames:v",
    "-f",
    "-preset",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub inputs: Vec<String>,
    pub output: Option<String>,
    pub notes: Vec<String>,
}

impl Explanation {
    /// Every line of the explanation, inputs and output first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.inputs.is_empty() {
            lines.push(format!("Input files: {}", self.inputs.join(", ")));
        }
        if let Some(output) = &self.output {
            lines.push(format!("Output file: {output}"));
        }
        lines.extend(self.notes.iter().cloned());
        if lines.is_empty() {
            lines.push("Basic ffmpeg command that converts or processes media files".to_string());
        }
        lines
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "  - {line}")?;
        }
        Ok(())
    }
}

/// Explain an ffmpeg token list. A leading `ffmpeg` program token is skipped.
pub fn explain<S: AsRef<str>>(tokens: &[S]) -> Explanation {
    let mut tokens = tokens.iter().map(<S as AsRef<str>>::as_ref).peekable();
    if tokens
        .peek()
        .is_some_and(|first| first.rsplit('/').next() == Some("ffmpeg"))
    {
        tokens.next();
    }

    let mut explanation = Explanation::default();
    let mut last_positional = None;
    while let Some(token) = tokens.next() {
        if VALUE_OPTIONS.contains(&token) {
            let value = tokens.next().unwrap_or_default();
            describe_option(&mut explanation, token, value);
        } else if token.starts_with('-') {
            describe_flag(&mut explanation, token);
        } else {
            last_positional = Some(display_safe(token));
        }
    }
    explanation.output = last_positional;
    explanation
}

fn describe_option(explanation: &mut Explanation, option: &str, value: &str) {
    let shown = display_safe(value);
    let note = match option {
        "-i" => {
            explanation.inputs.push(shown);
            return;
        }
        "-ss" => format!("Seeks to {shown}s before reading the input"),
        "-t" => format!("Limits the output duration to {shown}s"),
        "-to" => format!("Stops writing at {shown}s"),
        "-vf" | "-filter:v" | "-filter_complex" => describe_filter(value),
        "-af" => format!("Applies audio filter {shown}"),
        "-c:v" | "-vcodec" if value == "copy" => {
            "Copies the video stream without re-encoding".to_string()
        }
        "-c:v" | "-vcodec" => format!("Encodes video with {shown}"),
        "-c:a" | "-acodec" if value == "copy" => {
            "Copies the audio stream without re-encoding".to_string()
        }
        "-c:a" | "-acodec" => format!("Encodes audio with {shown}"),
        "-b:v" => format!("Bitrate-based video encoding at {shown}"),
        "-b:a" => format!("Audio bitrate {shown}"),
        "-crf" => format!("Quality-based encoding (CRF {shown}, lower is better)"),
        "-r" => format!("Sets the frame rate to {shown} fps"),
        "-frames:v" => format!("Extracts {shown} video frame(s)"),
        "-f" => format!("Forces the {shown} container format"),
        "-preset" => format!("Uses the {shown} encoder preset"),
        _ => format!("Sets {} to {shown}", display_safe(option)),
    };
    explanation.notes.push(note);
}

fn describe_filter(value: &str) -> String {
    if let Some(size) = value.strip_prefix("scale=") {
        let size = display_safe(size).replace(':', " x ");
        return format!("Scales the video to {size} (-1 or -2 keeps the aspect ratio)");
    }
    if let Some(position) = value.strip_prefix("overlay=") {
        let position = display_safe(position).replace(':', ", ");
        return format!("Overlays the second input at ({position})");
    }
    format!("Applies video filter {}", display_safe(value))
}

fn describe_flag(explanation: &mut Explanation, flag: &str) {
    let note = match flag {
        "-y" => "Overwrites the output file if it exists",
        "-n" => "Never overwrites an existing output file",
        "-an" => "Removes the audio stream",
        "-vn" => "Drops the video stream (audio only)",
        "-sn" => "Drops subtitle streams",
        "-hide_banner" | "-nostdin" => return,
        _ => {
            explanation
                .notes
                .push(format!("Uses option {}", display_safe(flag)));
            return;
        }
    };
    explanation.notes.push(note.to_string());
}
