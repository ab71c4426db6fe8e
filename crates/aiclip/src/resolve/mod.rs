//! Path Resolver: turns user path expressions into scope-verified files.
//!
//! Inputs are literal paths or shell-style glob patterns, interpreted relative to a
//! working directory. Every match is canonicalized (following symlinks) and checked
//! against the allowed roots before it becomes a [`ResolvedPath`]. Outputs are
//! either given explicitly or synthesized from the operation and the input name;
//! see [`output`].

pub mod output;

use crate::error::{AiclipError, AiclipResult};
use crate::model::{Config, ResolvedPath};
use crate::security::{display_safe, Validator};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Resolves path expressions against the allowed filesystem scope.
///
/// Side effects are limited to stat, readdir and canonicalize.
#[derive(Clone, Debug)]
pub struct PathResolver {
    validator: Validator,
    cwd: PathBuf,
}

impl PathResolver {
    #[must_use]
    pub fn new(validator: Validator, cwd: impl Into<PathBuf>) -> Self {
        Self {
            validator,
            cwd: cwd.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, cwd: impl Into<PathBuf>) -> Self {
        Self::new(Validator::from_config(config), cwd)
    }

    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Resolve input expressions into existing files.
    ///
    /// The result is sorted by canonical path and de-duplicated. Every expression
    /// must match at least one regular file; directories never match.
    pub fn resolve_inputs<S: AsRef<str>>(&self, expressions: &[S]) -> AiclipResult<Vec<ResolvedPath>> {
        if expressions.is_empty() {
            return Err(AiclipError::path_resolution(
                "no input files were given",
                serde_json::json!({ "fix": "Name at least one input file or glob pattern" }),
            ));
        }
        let mut found = BTreeSet::new();
        for expression in expressions {
            let expression = expression.as_ref();
            let matches = self.resolve_expression(expression)?;
            if matches.is_empty() {
                return Err(AiclipError::path_resolution(
                    "no files matched",
                    serde_json::json!({
                        "expression": display_safe(expression),
                        "cwd": self.cwd.display().to_string(),
                    }),
                ));
            }
            found.extend(matches);
        }
        tracing::debug!(count = found.len(), "resolved input files");
        Ok(found.into_iter().map(ResolvedPath::input).collect())
    }

    /// Resolve an expression that must name exactly one existing file.
    pub fn resolve_single_input(&self, expression: &str) -> AiclipResult<ResolvedPath> {
        let mut inputs = self.resolve_inputs(&[expression])?;
        if inputs.len() != 1 {
            return Err(AiclipError::path_resolution(
                "expression must match exactly one file",
                serde_json::json!({
                    "expression": display_safe(expression),
                    "matches": inputs.len(),
                }),
            ));
        }
        inputs.pop().ok_or_else(|| {
            AiclipError::path_resolution("no files matched", None)
        })
    }

    fn resolve_expression(&self, expression: &str) -> AiclipResult<Vec<PathBuf>> {
        if expression.trim().is_empty() {
            return Err(AiclipError::path_resolution("empty path expression", None));
        }
        self.validator.check_path_text(expression)?;
        let candidate = self.absolutize(Path::new(expression));
        // A file literally named `clip[1].mp4` wins over the pattern it spells.
        if expression.contains(GLOB_CHARS) && !candidate.exists() {
            return self.expand_glob(expression);
        }
        let canonical = self.validator.contain_existing(&candidate)?;
        if canonical.is_dir() {
            return Err(AiclipError::path_resolution(
                "input is a directory",
                serde_json::json!({
                    "path": display_safe(expression),
                    "fix": "Use a glob such as dir/*.mp4 to select files inside a directory",
                }),
            ));
        }
        self.ensure_displayable(&canonical)?;
        Ok(vec![canonical])
    }

    fn expand_glob(&self, expression: &str) -> AiclipResult<Vec<PathBuf>> {
        let pattern = if Path::new(expression).is_absolute() {
            expression.to_string()
        } else {
            let base = glob::Pattern::escape(&self.cwd.to_string_lossy());
            format!("{base}/{expression}")
        };
        let options = glob::MatchOptions {
            require_literal_leading_dot: true,
            ..glob::MatchOptions::new()
        };
        let entries = glob::glob_with(&pattern, options).map_err(|err| {
            AiclipError::path_resolution(
                format!("invalid glob pattern: {err}"),
                serde_json::json!({ "expression": display_safe(expression) }),
            )
        })?;
        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| {
                AiclipError::path_resolution(
                    format!("error reading matches: {err}"),
                    serde_json::json!({ "expression": display_safe(expression) }),
                )
            })?;
            let canonical = self.validator.contain_existing(&path)?;
            if canonical.is_file() {
                self.ensure_displayable(&canonical)?;
                matches.push(canonical);
            }
        }
        Ok(matches)
    }

    /// Reject matched files whose names could not later become argument tokens.
    fn ensure_displayable(&self, canonical: &Path) -> AiclipResult<()> {
        let Some(text) = canonical.to_str() else {
            return Err(AiclipError::path_resolution(
                "path is not valid UTF-8",
                serde_json::json!({ "path": display_safe(&canonical.to_string_lossy()) }),
            ));
        };
        self.validator.check_path_text(text)
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}
