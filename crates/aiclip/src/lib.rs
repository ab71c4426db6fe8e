//! aiclip: a safety layer between a natural-language media interpreter and ffmpeg.
//!
//! An interpreter's structured reply ([`intent::Intent`]) is compiled into a
//! validated [`ActionDescriptor`], turned into one or more [`CommandPlan`]s
//! whose every argv token was minted by the [`security::Validator`], previewed,
//! confirmed when destructive, and finally run as a direct child process under
//! timeout, capture and cancellation control.

#![forbid(unsafe_code)]
// Public API types carry docs; internal helpers are documented where they are not obvious.
#![allow(missing_docs)]

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod explain;
pub mod intent;
pub mod model;
pub mod resolve;
pub mod security;

pub use crate::error::{AiclipError, AiclipResult, ErrorCode};
pub use crate::model::*;

pub mod pipeline {
    use super::builder::{BatchBuild, CommandBuilder};
    use super::intent::Intent;
    use super::resolve::PathResolver;
    use super::{ActionDescriptor, AiclipResult, Config};
    use std::path::Path;

    /// Resolve an intent against `config`, relative to `cwd`.
    pub fn compile(intent: &Intent, config: &Config, cwd: &Path) -> AiclipResult<ActionDescriptor> {
        let resolver = PathResolver::from_config(config, cwd);
        intent.compile(&resolver, &config.defaults)
    }

    /// Compile an intent and build one plan per input.
    pub fn plan(intent: &Intent, config: &Config, cwd: &Path) -> AiclipResult<BatchBuild> {
        let descriptor = compile(intent, config, cwd)?;
        Ok(CommandBuilder::new(config).build_batch(&descriptor))
    }

    /// Parse an interpreter reply, then [`plan`] it.
    pub fn plan_json(json: &str, config: &Config, cwd: &Path) -> AiclipResult<BatchBuild> {
        plan(&Intent::from_json(json)?, config, cwd)
    }
}
