//! Quoting error types.

use impact_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MmError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Position {position} matched no inventory band")]
    UnmatchedInventoryBand { position: i64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Quote stage '{stage}' failed: {reason}")]
    StageFailed { stage: &'static str, reason: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type MmResult<T> = Result<T, MmError>;
