//! Application error types.

use impact_executor::{ConvergeError, ExchangeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Maker error: {0}")]
    Maker(#[from] impact_mm::MmError),

    #[error("Core error: {0}")]
    Core(#[from] impact_core::CoreError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] impact_telemetry::TelemetryError),

    /// Exchange data is inconsistent; orders were cancelled.
    #[error("Sanity check failed: {0}")]
    SanityCheck(String),

    /// Amend failed for an unrecognized reason.
    #[error("Unknown error on amend: {0}")]
    FatalAmend(ExchangeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConvergeError> for AppError {
    fn from(err: ConvergeError) -> Self {
        match err {
            ConvergeError::FatalAmend(e) => Self::FatalAmend(e),
            ConvergeError::Exchange(e) => Self::Exchange(e),
        }
    }
}

impl AppError {
    /// Errors that end the run the same way a shutdown signal does: orders
    /// are cancelled and the process exits with status 0.
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, Self::SanityCheck(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
