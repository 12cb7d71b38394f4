//! Order execution for the impact market maker.
//!
//! # Key Components
//!
//! - [`Exchange`]: venue session the order manager reads from and mutates
//! - [`ConvergenceEngine`]: moves resting orders onto the desired set with
//!   the fewest amends, creates and cancels
//! - [`PaperExchange`]: in-memory venue with scriptable failures
//! - [`DryRunExchange`]: wrapper that logs mutations instead of sending them
//!
//! # Convergence Order
//!
//! 1. Amend (stale order -> `ConvergeOutcome::RaceDetected`)
//! 2. Create
//! 3. Cancel

pub mod converge;
pub mod dry_run;
pub mod error;
pub mod exchange;
pub mod paper;

pub use converge::{
    needs_amend, plan, ConvergeOutcome, ConvergeState, ConvergeSummary, ConvergenceEngine,
    ConvergencePlan,
};
pub use dry_run::DryRunExchange;
pub use error::{ConvergeError, ConvergeResult, ExchangeError, ExchangeResult};
pub use exchange::{DynExchange, Exchange};
pub use paper::{PaperCall, PaperConfig, PaperExchange, PaperLevel};
