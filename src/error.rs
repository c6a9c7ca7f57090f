//! Configuration error types.
//!
//! Everything here is fatal: these errors are reported before any virtual
//! user starts, either by clap value parsers or by `RunConfig::validate`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one stage is required")]
    EmptyStages,

    #[error("stage {index} has zero duration")]
    ZeroDurationStage { index: usize },

    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid stage '{input}': expected <duration>:<target>, e.g. '2m:100'")]
    InvalidStage { input: String },

    #[error("invalid threshold '{input}': {reason}")]
    InvalidThreshold { input: String, reason: String },

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
