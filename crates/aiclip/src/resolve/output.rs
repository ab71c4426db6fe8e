//! Output path resolution and default naming.
//!
//! | Operation    | Default output                  |
//! |--------------|---------------------------------|
//! | Convert      | `<stem>_converted.<container>`  |
//! | Scale        | `<stem>_scaled.<input ext>`     |
//! | Compress     | `<stem>_compressed.<input ext>` |
//! | ExtractAudio | `<stem>_audio.<audio ext>`      |
//! | RemoveAudio  | `<stem>_mute.<input ext>`       |
//! | Trim         | `<stem>_trimmed.<input ext>`    |
//! | Thumbnail    | `<stem>_thumb.<image format>`   |
//! | Overlay      | `<stem>_overlay.<input ext>`    |

use super::PathResolver;
use crate::error::{AiclipError, AiclipResult};
use crate::model::{Defaults, Operation, ResolvedPath};
use crate::security::display_safe;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Synthesize the default output file name for `input`.
pub fn default_output_name(op: Operation, input: &Path, defaults: &Defaults) -> AiclipResult<String> {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            AiclipError::path_resolution(
                "input has no usable file name",
                serde_json::json!({ "path": display_safe(&input.to_string_lossy()) }),
            )
        })?;
    let input_ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or(defaults.container.as_str());
    let (suffix, ext) = match op {
        Operation::Convert => ("converted", defaults.container.as_str()),
        Operation::Scale => ("scaled", input_ext),
        Operation::Compress => ("compressed", input_ext),
        Operation::ExtractAudio => ("audio", defaults.extract_audio_extension.as_str()),
        Operation::RemoveAudio => ("mute", input_ext),
        Operation::Trim => ("trimmed", input_ext),
        Operation::Thumbnail => ("thumb", defaults.thumbnail_format.as_str()),
        Operation::Overlay => ("overlay", input_ext),
    };
    Ok(format!("{stem}_{suffix}.{ext}"))
}

impl PathResolver {
    /// Resolve an explicitly requested output path.
    ///
    /// The parent directory must exist under an allowed root. The file itself may
    /// or may not exist; an existing file is recorded so the plan is flagged
    /// destructive.
    pub fn resolve_output(&self, requested: &str) -> AiclipResult<ResolvedPath> {
        self.validator().check_path_text(requested)?;
        let path = self.absolutize(Path::new(requested));
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return Err(AiclipError::path_resolution(
                "output path has no file name",
                serde_json::json!({ "path": display_safe(requested) }),
            ));
        };
        let parent = path.parent().unwrap_or(Path::new("/"));
        let dir = self.resolve_dir(parent)?;
        self.place_output(&dir, name)
    }

    /// Resolve an output directory, which must exist under an allowed root.
    pub fn resolve_output_dir(&self, requested: &str) -> AiclipResult<PathBuf> {
        self.validator().check_path_text(requested)?;
        self.resolve_dir(&self.absolutize(Path::new(requested)))
    }

    /// Default output for a single input, next to it or in `output_dir`.
    pub fn default_output(
        &self,
        op: Operation,
        input: &ResolvedPath,
        output_dir: Option<&Path>,
        defaults: &Defaults,
    ) -> AiclipResult<ResolvedPath> {
        let name = default_output_name(op, input.path(), defaults)?;
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input.path().parent().map(Path::to_path_buf).ok_or_else(|| {
                AiclipError::path_resolution(
                    "input has no parent directory",
                    serde_json::json!({ "path": input.path().display().to_string() }),
                )
            })?,
        };
        self.place_output(&dir, &name)
    }

    /// One default output per input, in input order.
    ///
    /// Two inputs mapping to the same output is an error naming both inputs.
    pub fn batch_outputs(
        &self,
        op: Operation,
        inputs: &[ResolvedPath],
        output_dir: Option<&Path>,
        defaults: &Defaults,
    ) -> AiclipResult<Vec<ResolvedPath>> {
        let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            let output = self.default_output(op, input, output_dir, defaults)?;
            if let Some(first) = claimed.insert(output.path().to_path_buf(), input.path()) {
                return Err(AiclipError::path_resolution(
                    "two inputs map to the same output",
                    serde_json::json!({
                        "output": output.path().display().to_string(),
                        "inputs": [first.display().to_string(), input.path().display().to_string()],
                        "fix": "Rename one of the inputs or process them separately",
                    }),
                ));
            }
            outputs.push(output);
        }
        Ok(outputs)
    }

    fn resolve_dir(&self, dir: &Path) -> AiclipResult<PathBuf> {
        let canonical = self.validator().contain_existing(dir).map_err(|err| {
            if err.code == crate::error::ErrorCode::PathTraversal {
                err
            } else {
                AiclipError::path_resolution(
                    "output directory does not exist",
                    serde_json::json!({ "dir": display_safe(&dir.to_string_lossy()) }),
                )
            }
        })?;
        if !canonical.is_dir() {
            return Err(AiclipError::path_resolution(
                "output directory is not a directory",
                serde_json::json!({ "dir": display_safe(&dir.to_string_lossy()) }),
            ));
        }
        Ok(canonical)
    }

    /// Check the final output location inside an already-canonical directory.
    fn place_output(&self, dir: &Path, name: &str) -> AiclipResult<ResolvedPath> {
        self.validator().check_path_text(name)?;
        if name == "." || name == ".." || name.contains('/') {
            return Err(AiclipError::path_resolution(
                "invalid output file name",
                serde_json::json!({ "name": display_safe(name) }),
            ));
        }
        let candidate = dir.join(name);
        let Ok(meta) = std::fs::symlink_metadata(&candidate) else {
            self.validator().ensure_allowed(&candidate, &candidate)?;
            return Ok(ResolvedPath::output(candidate, false));
        };
        // An existing entry may be a symlink; what gets written is its target.
        let target = if meta.file_type().is_symlink() {
            self.validator().contain_existing(&candidate)?
        } else {
            candidate
        };
        if target.is_dir() {
            return Err(AiclipError::path_resolution(
                "output path is an existing directory",
                serde_json::json!({ "path": target.display().to_string() }),
            ));
        }
        self.validator().ensure_allowed(&target, &target)?;
        Ok(ResolvedPath::output(target, true))
    }
}
