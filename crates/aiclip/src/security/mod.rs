//! The single chokepoint between user-influenced data and the external tool.
//!
//! Every path and argument value passes through [`Validator`] before it can become
//! part of a [`CommandPlan`](crate::model::CommandPlan). Tokens are wrapped in
//! [`SafeToken`], which only this module can construct, so an argument vector
//! is proof that each element was checked.

mod path;
mod redact;
mod tokens;

pub(crate) use path::is_root_path;
pub use path::{is_shell_program, lexically_normalize};
pub use redact::{display_safe, mask_secret, sanitize_message, DISPLAY_LIMIT};
pub use tokens::{
    Bounds, Flag, BITRATE_BITS, CRF, DIMENSION, DURATION_MS, FPS, OFFSET, QUALITY,
    SHELL_METACHARACTERS, START_MS,
};

use crate::model::Config;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// An argument token that has passed validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeToken(String);

impl SafeToken {
    fn mint(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stateless gatekeeper for paths and argument values.
///
/// Holds only the canonical allowed roots; every check is a pure function of its
/// inputs and those roots, except path containment, which canonicalizes on disk.
#[derive(Clone, Debug)]
pub struct Validator {
    roots: Vec<PathBuf>,
}

impl Validator {
    /// Create a validator over canonical allowed roots.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.allowed_roots.clone())
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}
