//! Impact market maker application.
//!
//! Wires the quoting engine to an exchange session:
//! - configuration loading and validation
//! - the order manager tick (sanity check, quote, converge)
//! - exit handling that cancels resting orders on the way out

pub mod app;
pub mod config;
pub mod error;
pub mod shutdown;

pub use app::{OrderManager, TickOutcome};
pub use config::{AppConfig, RuntimeConfig, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use shutdown::{ExitHandler, ShutdownSignal};

use impact_executor::{DryRunExchange, DynExchange, PaperExchange};
use std::sync::Arc;

/// Build the exchange session described by `config`.
pub fn build_exchange(config: &AppConfig) -> AppResult<DynExchange> {
    let paper = PaperExchange::from_config(&config.paper)?;
    if config.runtime.dry_run {
        Ok(Arc::new(DryRunExchange::new(paper)))
    } else {
        Ok(Arc::new(paper))
    }
}
