//! Loading and validating [`Config`].
//!
//! A config file (JSON, or YAML by extension) is optional. Environment
//! variables are applied on top of it, then [`validate_config`] turns the
//! result into something the pipeline can trust: canonical roots and a tool
//! path that is a real executable and not a shell.

use crate::error::{AiclipError, AiclipResult};
use crate::model::{Config, MAX_PARALLELISM};
use crate::security::{is_root_path, is_shell_program};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const ENV_ALLOWED_DIRS: &str = "AICLIP_ALLOWED_DIRS";
pub const ENV_FFMPEG: &str = "AICLIP_FFMPEG";
pub const ENV_TIMEOUT: &str = "AICLIP_TIMEOUT";
pub const ENV_DRY_RUN: &str = "AICLIP_DRY_RUN";
pub const ENV_MAX_PARALLEL: &str = "AICLIP_MAX_PARALLEL";

/// Read the config file (if any), apply process environment overrides and
/// default the allowed roots to the current directory.
///
/// The result is not yet validated; pass it through [`validate_config`].
pub fn load_config(path: Option<&Path>) -> AiclipResult<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    if config.allowed_roots.is_empty() {
        let cwd = std::env::current_dir()
            .map_err(|err| AiclipError::io("failed to read current directory", err))?;
        config.allowed_roots.push(cwd);
    }
    Ok(config)
}

/// Parse a config file. `.yaml`/`.yml` files are YAML, anything else JSON.
pub fn load_config_file(path: &Path) -> AiclipResult<Config> {
    let data = std::fs::read_to_string(path).map_err(|err| {
        AiclipError::config(
            format!("failed to read config file: {err}"),
            serde_json::json!({
                "path": path.display().to_string(),
                "fix": "Check the --config path",
            }),
        )
    })?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let parsed = if is_yaml {
        serde_yml::from_str(&data).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(&data).map_err(|err| err.to_string())
    };
    parsed.map_err(|err| {
        AiclipError::config(
            format!("invalid config file: {err}"),
            serde_json::json!({ "path": path.display().to_string() }),
        )
    })
}

/// Apply `AICLIP_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> AiclipResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dirs) = lookup(ENV_ALLOWED_DIRS) {
        config.allowed_roots = dirs
            .split(',')
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .collect();
    }
    if let Some(program) = lookup(ENV_FFMPEG).filter(|value| !value.trim().is_empty()) {
        config.tool.program = PathBuf::from(program.trim());
    }
    if let Some(seconds) = lookup(ENV_TIMEOUT) {
        let seconds: u64 = seconds
            .trim()
            .parse()
            .map_err(|_| env_error(ENV_TIMEOUT, &seconds, "a whole number of seconds"))?;
        config.execution.timeout_ms = seconds.saturating_mul(1000);
    }
    if let Some(flag) = lookup(ENV_DRY_RUN) {
        config.execution.dry_run = match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            _ => return Err(env_error(ENV_DRY_RUN, &flag, "1/true/yes or 0/false/no")),
        };
    }
    if let Some(workers) = lookup(ENV_MAX_PARALLEL) {
        config.execution.max_parallelism = workers
            .trim()
            .parse()
            .map_err(|_| env_error(ENV_MAX_PARALLEL, &workers, "a positive integer"))?;
    }
    Ok(())
}

fn env_error(var: &str, value: &str, expected: &str) -> AiclipError {
    AiclipError::config(
        format!("invalid value for {var}"),
        serde_json::json!({
            "var": var,
            "value": crate::security::display_safe(value),
            "fix": format!("Set {var} to {expected}"),
        }),
    )
}

/// Check and normalize a loaded config.
pub fn validate_config(mut config: Config) -> AiclipResult<Config> {
    if config.allowed_roots.is_empty() {
        return Err(AiclipError::config(
            "no allowed directories configured",
            serde_json::json!({ "fix": format!("Set {ENV_ALLOWED_DIRS} or allowed_roots") }),
        ));
    }
    config.allowed_roots = config
        .allowed_roots
        .iter()
        .map(PathBuf::as_path)
        .map(validate_root)
        .collect::<AiclipResult<Vec<_>>>()?;
    config.allowed_roots.sort();
    config.allowed_roots.dedup();

    config.tool.program = resolve_tool(&config.tool.program, std::env::var_os("PATH"))?;

    if config.execution.timeout_ms == 0 {
        return Err(AiclipError::config(
            "timeout must be greater than zero",
            serde_json::json!({ "fix": "Set execution.timeout_ms to a positive value" }),
        ));
    }
    config.execution.max_parallelism = config.execution.max_parallelism.clamp(1, MAX_PARALLELISM);
    Ok(config)
}

fn validate_root(root: &Path) -> AiclipResult<PathBuf> {
    if !root.is_absolute() {
        return Err(AiclipError::config(
            "allowed directories must be absolute",
            serde_json::json!({
                "path": root.display().to_string(),
                "fix": "Use an absolute path starting with /",
            }),
        ));
    }
    let canonical = std::fs::canonicalize(root).map_err(|err| {
        AiclipError::config(
            format!("allowed directory does not exist: {err}"),
            serde_json::json!({ "path": root.display().to_string() }),
        )
    })?;
    if !canonical.is_dir() {
        return Err(AiclipError::config(
            "allowed directory is not a directory",
            serde_json::json!({ "path": canonical.display().to_string() }),
        ));
    }
    if is_root_path(&canonical) {
        return Err(AiclipError::config(
            "the filesystem root cannot be an allowed directory",
            serde_json::json!({
                "path": root.display().to_string(),
                "fix": "Allow a specific media directory instead",
            }),
        ));
    }
    Ok(canonical)
}

fn resolve_tool(program: &Path, path_var: Option<OsString>) -> AiclipResult<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|err| AiclipError::io("failed to read current directory", err))?;
    let is_bare = program.components().count() == 1 && !program.is_absolute();
    let located = which::which_in(program, path_var, cwd).map_err(|err| {
        if is_bare {
            AiclipError::config(
                format!("'{}' was not found on PATH", program.display()),
                serde_json::json!({
                    "tool": program.display().to_string(),
                    "fix": format!("Install it or set {ENV_FFMPEG} to its absolute path"),
                }),
            )
        } else {
            AiclipError::config(
                format!("tool is not an executable file: {err}"),
                serde_json::json!({ "tool": program.display().to_string() }),
            )
        }
    })?;
    let canonical = std::fs::canonicalize(&located).map_err(|err| {
        AiclipError::config(
            format!("tool does not exist: {err}"),
            serde_json::json!({ "tool": located.display().to_string() }),
        )
    })?;
    if is_shell_program(&located) || is_shell_program(&canonical) {
        tracing::warn!(tool = %located.display(), "shell interpreter rejected as media tool");
        return Err(AiclipError::config(
            "a shell interpreter cannot be used as the media tool",
            serde_json::json!({
                "tool": located.display().to_string(),
                "fix": format!("Point {ENV_FFMPEG} at the ffmpeg binary"),
            }),
        ));
    }
    Ok(canonical)
}
