pub mod action;
pub mod config;
pub mod ids;
pub mod plan;

pub use action::*;
pub use config::{
    Config, ConfigBuilder, Defaults, ExecutionConfig, ToolConfig, DEFAULT_CAPTURE_BYTES,
    DEFAULT_TIMEOUT_MS, MAX_PARALLELISM,
};
pub use ids::{BatchId, PlanId};
pub use plan::*;
