//! Prometheus metrics and structured logging for the impact market maker.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - Prometheus counters and gauges for the tick loop, order flow and quotes

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
