use super::{display_safe, SafeToken, Validator, SHELL_METACHARACTERS};
use crate::error::{AiclipError, AiclipResult};
use std::path::{Component, Path, PathBuf};

const SHELL_NAMES: &[&str] = &["sh", "bash", "zsh", "dash", "fish", "ksh", "tcsh", "csh"];

impl Validator {
    /// Reject a raw path expression containing control or shell metacharacters.
    #[allow(clippy::unused_self)]
    pub fn check_path_text(&self, raw: &str) -> AiclipResult<()> {
        if let Some(bad) = raw.chars().find(|c| c.is_control()) {
            return Err(AiclipError::path_resolution(
                "path contains a control character",
                serde_json::json!({
                    "path": display_safe(raw),
                    "character": format!("U+{:04X}", u32::from(bad)),
                }),
            ));
        }
        if let Some(bad) = raw.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return Err(AiclipError::path_resolution(
                "path contains a shell metacharacter",
                serde_json::json!({
                    "path": display_safe(raw),
                    "character": bad.to_string(),
                    "fix": "Rename the file without ; | & $ ` > < characters",
                }),
            ));
        }
        Ok(())
    }

    /// Whether a canonical path equals or descends from an allowed root.
    #[must_use]
    pub fn is_allowed(&self, canonical: &Path) -> bool {
        self.roots().iter().any(|root| canonical.starts_with(root))
    }

    /// Canonicalize an existing path, following symlinks, and check its scope.
    pub fn contain_existing(&self, path: &Path) -> AiclipResult<PathBuf> {
        let canonical = std::fs::canonicalize(path).map_err(|err| {
            AiclipError::path_resolution(
                format!("cannot resolve path: {err}"),
                serde_json::json!({ "path": display_safe(&path.to_string_lossy()) }),
            )
        })?;
        self.ensure_allowed(&canonical, path)?;
        Ok(canonical)
    }

    /// Fail with `PathTraversal` unless `canonical` lies under an allowed root.
    pub fn ensure_allowed(&self, canonical: &Path, requested: &Path) -> AiclipResult<()> {
        if self.is_allowed(canonical) {
            return Ok(());
        }
        tracing::warn!(
            path = %display_safe(&requested.to_string_lossy()),
            "rejected path outside allowed roots"
        );
        Err(AiclipError::path_traversal(
            "path resolves outside the allowed directories",
            serde_json::json!({
                "path": display_safe(&requested.to_string_lossy()),
                "allowed_roots": self
                    .roots()
                    .iter()
                    .map(|root| root.display().to_string())
                    .collect::<Vec<_>>(),
                "fix": "Move the file under an allowed directory or extend AICLIP_ALLOWED_DIRS",
            }),
        ))
    }

    /// Mint an argument token for a resolved path.
    ///
    /// Purely lexical: the path must already be canonical, so this re-checks
    /// shape and scope without touching the filesystem.
    pub fn path_token(&self, path: &Path) -> AiclipResult<SafeToken> {
        let Some(text) = path.to_str() else {
            return Err(AiclipError::path_resolution(
                "path is not valid UTF-8",
                serde_json::json!({ "path": display_safe(&path.to_string_lossy()) }),
            ));
        };
        self.check_path_text(text)?;
        if !path.is_absolute() || lexically_normalize(path) != path {
            return Err(AiclipError::path_resolution(
                "path is not canonical",
                serde_json::json!({ "path": display_safe(text) }),
            ));
        }
        self.ensure_allowed(path, path)?;
        Ok(SafeToken::mint(text))
    }
}

/// Remove `.` and resolve `..` components without following symlinks.
///
/// `..` at the root is dropped, so the result can never climb above `/`.
#[must_use]
pub fn lexically_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    normalized.pop();
                    depth -= 1;
                }
            }
            Component::Normal(part) => {
                normalized.push(part);
                depth += 1;
            }
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from("/")
    } else {
        normalized
    }
}

/// Whether `program` is, or links to, a shell interpreter or shell script.
#[must_use]
pub fn is_shell_program(program: &Path) -> bool {
    if program.extension().is_some_and(|ext| ext == "sh") {
        return true;
    }
    // Resolve symlinks so `ln -s /bin/bash ffmpeg` is still caught.
    let resolved = std::fs::canonicalize(program).unwrap_or_else(|_| program.to_path_buf());
    resolved
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| SHELL_NAMES.contains(&name))
}

/// Whether the path is the filesystem root.
pub(crate) fn is_root_path(path: &Path) -> bool {
    let mut components = path.components();
    matches!(components.next(), Some(Component::RootDir)) && components.next().is_none()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_dot_segments_and_cannot_escape_root() {
        assert_eq!(
            lexically_normalize(Path::new("/srv/media/./a/../b.mp4")),
            PathBuf::from("/srv/media/b.mp4")
        );
        assert_eq!(
            lexically_normalize(Path::new("/../../etc/passwd")),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn shell_programs_are_detected() {
        assert!(is_shell_program(Path::new("/nonexistent/bin/bash")));
        assert!(is_shell_program(Path::new("/opt/tools/run.sh")));
        assert!(!is_shell_program(Path::new("/usr/bin/ffmpeg-does-not-exist")));
    }

    #[test]
    fn root_is_recognized() {
        assert!(is_root_path(Path::new("/")));
        assert!(!is_root_path(Path::new("/srv")));
    }

    #[test]
    fn path_token_rejects_non_canonical_and_foreign_paths() {
        let validator = Validator::new(vec![PathBuf::from("/srv/media")]);
        assert!(validator.path_token(Path::new("/srv/media/a.mp4")).is_ok());
        assert!(validator.path_token(Path::new("/srv/media/../a.mp4")).is_err());
        assert!(validator.path_token(Path::new("relative.mp4")).is_err());
        let err = validator
            .path_token(Path::new("/etc/passwd"))
            .expect_err("outside root");
        assert_eq!(err.code, crate::error::ErrorCode::PathTraversal);
    }
}
