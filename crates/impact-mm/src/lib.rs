//! Quoting engine for the impact market maker.
//!
//! - `impact`: price displacement of a marketable order and its inverse
//! - `flow`: deduplicated trade window, size CDFs and arrival rates
//! - `optimizer`: depth maximizing `depth * P(fill)` per side
//! - `ladder`: static geometric ladder used while flow data is thin
//! - `inventory`: discrete quote skew by net position
//! - `limits`: position limit predicates
//! - `strategy` / `pipeline`: strategies producing the desired order set
//!
//! # Architecture
//!
//! ```text
//! Book + recent trades
//!     ├─ TradeFlowEstimator: size CDF per aggressor side
//!     └─ QuoteOptimizer: impact curve → candidate depths → argmax EV
//!          └─ InventorySkew → PositionLimitGuard → DesiredOrders
//!                                                      ↓
//!                                  impact-executor convergence engine
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod impact;
pub mod inventory;
pub mod ladder;
pub mod limits;
pub mod optimizer;
pub mod pipeline;
pub mod strategy;

pub use config::{MakerConfig, StrategyKind};
pub use error::{MmError, MmResult};
pub use flow::{EmpiricalCdf, FlowSnapshot, TradeFlowEstimator, TradeWindow};
pub use impact::{cumulative_qty, impact, impact_curve, inverse_impact, mid, CriticalSize};
pub use inventory::InventorySkew;
pub use ladder::{StartPrices, StaticLadder};
pub use limits::{LimitFlags, PositionLimitGuard};
pub use optimizer::{OptimalQuotes, QuoteOptimizer};
pub use pipeline::{QuoteContext, QuotePipeline, QuoteStage};
pub use strategy::{
    build_strategy, EdgePriceStrategy, ImpactStrategy, StaticLadderStrategy, Strategy, TickState,
};
