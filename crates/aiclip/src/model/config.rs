use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::Position;

/// Default per-plan wall-clock timeout (one hour).
pub const DEFAULT_TIMEOUT_MS: u64 = 60 * 60 * 1000;
/// Default byte budget for each captured output stream.
pub const DEFAULT_CAPTURE_BYTES: usize = 64 * 1024;
/// Upper bound for batch parallelism.
pub const MAX_PARALLELISM: usize = 8;

// =============================================================================
// Configuration Types
// =============================================================================

/// Immutable runtime configuration, loaded once per process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directories under which every input and output must live.
    #[serde(default)]
    pub allowed_roots: Vec<PathBuf>,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// The external media tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable path. A bare name is looked up on `PATH` during validation.
    pub program: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }
}

/// Smart defaults applied when a parameter is absent.
///
/// These are product choices rather than logic, so they live in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub video_codec: String,
    pub audio_codec: String,
    /// Audio codec for operations that only touch the picture (scale, trim, overlay).
    pub passthrough_audio_codec: String,
    /// Video codec for operations that only cut the stream (trim, remove audio).
    pub passthrough_video_codec: String,
    pub compress_video_codec: String,
    pub compress_crf: u32,
    pub extract_audio_codec: String,
    pub extract_audio_extension: String,
    /// Container extension for converted outputs.
    pub container: String,
    /// Image format extension for thumbnails.
    pub thumbnail_format: String,
    pub overlay_position: Position,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            passthrough_audio_codec: "copy".to_string(),
            passthrough_video_codec: "copy".to_string(),
            compress_video_codec: "libx265".to_string(),
            compress_crf: 28,
            extract_audio_codec: "libmp3lame".to_string(),
            extract_audio_extension: "mp3".to_string(),
            container: "mp4".to_string(),
            thumbnail_format: "png".to_string(),
            overlay_position: Position { x: 10, y: 10 },
        }
    }
}

/// Execution limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub timeout_ms: u64,
    /// Batch worker count. 1 runs plans sequentially.
    pub max_parallelism: usize,
    /// Bytes kept per captured stream.
    pub capture_bytes: usize,
    /// Preview plans without running them.
    pub dry_run: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_parallelism: 1,
            capture_bytes: DEFAULT_CAPTURE_BYTES,
            dry_run: false,
        }
    }
}

// =============================================================================
// ConfigBuilder
// =============================================================================

/// Fluent builder for [`Config`].
///
/// # Example
///
/// ```ignore
/// use aiclip::model::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .allowed_root("/srv/media".into())
///     .tool("/usr/bin/ffmpeg".into())
///     .timeout_ms(120_000)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the allowed roots.
    #[must_use]
    pub fn allowed_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.allowed_roots = roots;
        self
    }

    /// Add a directory to the allowed roots.
    #[must_use]
    pub fn allowed_root(mut self, root: PathBuf) -> Self {
        self.config.allowed_roots.push(root);
        self
    }

    #[must_use]
    pub fn tool(mut self, program: PathBuf) -> Self {
        self.config.tool.program = program;
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.config.defaults = defaults;
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.execution.timeout_ms = ms;
        self
    }

    /// Set batch parallelism, clamped to `1..=MAX_PARALLELISM`.
    #[must_use]
    pub fn max_parallelism(mut self, workers: usize) -> Self {
        self.config.execution.max_parallelism = workers.clamp(1, MAX_PARALLELISM);
        self
    }

    #[must_use]
    pub fn capture_bytes(mut self, bytes: usize) -> Self {
        self.config.execution.capture_bytes = bytes;
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.execution.dry_run = dry_run;
        self
    }

    /// Build the configuration. Use `aiclip::config::validate_config` before use.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
