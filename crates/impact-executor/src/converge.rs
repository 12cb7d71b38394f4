//! Order convergence.
//!
//! Reconciles the orders we have resting with the orders the strategy wants,
//! using the fewest exchange mutations:
//!
//! - each live order is paired with the next unconsumed desired order of its
//!   side, in the order the exchange reports them
//! - a pair is amended only if the quantity differs or the price moved by
//!   more than the relist tolerance
//! - live orders left without a partner are cancelled
//! - desired orders left without a partner are created
//!
//! Desired orders arrive outermost first, so when the inner order fills the
//! outer ones keep their pairing and only the inner level is recreated.
//!
//! Batches run amend, then create, then cancel. A stale-order amend failure
//! is reported as `ConvergeOutcome::RaceDetected` so the caller can re-tick.

use impact_core::{Amendment, DesiredOrder, DesiredOrders, Instrument, LiveOrder, Side};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::error::{ConvergeError, ConvergeResult, ExchangeError};
use crate::exchange::Exchange;

// ============================================================================
// Plan
// ============================================================================

/// Mutations needed to move the live set onto the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergencePlan {
    pub amend: Vec<Amendment>,
    pub create: Vec<DesiredOrder>,
    pub cancel: Vec<LiveOrder>,
}

impl ConvergencePlan {
    pub fn is_empty(&self) -> bool {
        self.amend.is_empty() && self.create.is_empty() && self.cancel.is_empty()
    }
}

/// Whether `live` has to be amended to become `desired`.
pub fn needs_amend(live: &LiveOrder, desired: &DesiredOrder, relist_tolerance: Decimal) -> bool {
    if desired.qty != live.leaves_qty {
        return true;
    }
    if desired.price == live.price {
        return false;
    }
    match desired.price.relative_change(live.price) {
        Some(change) => change > relist_tolerance,
        // A zero reference price can only be fixed by amending.
        None => true,
    }
}

/// Pair live orders with desired orders and compute the mutations.
pub fn plan(live: &[LiveOrder], desired: &DesiredOrders, relist_tolerance: Decimal) -> ConvergencePlan {
    let mut out = ConvergencePlan::default();
    let mut buys_matched = 0;
    let mut sells_matched = 0;

    for order in live {
        let (wanted, cursor) = match order.side {
            Side::Buy => (&desired.buys, &mut buys_matched),
            Side::Sell => (&desired.sells, &mut sells_matched),
        };
        match wanted.get(*cursor) {
            Some(target) => {
                *cursor += 1;
                if needs_amend(order, target, relist_tolerance) {
                    out.amend.push(Amendment::from_live(order, target));
                }
            }
            None => out.cancel.push(order.clone()),
        }
    }

    out.create.extend(desired.buys.iter().skip(buys_matched).cloned());
    out.create.extend(desired.sells.iter().skip(sells_matched).cloned());
    out
}

// ============================================================================
// Engine
// ============================================================================

/// Phase of a convergence pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeState {
    Matching,
    Amending,
    Creating,
    Cancelling,
    Done,
}

/// Counts of mutations sent in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvergeSummary {
    pub amended: usize,
    pub created: usize,
    pub cancelled: usize,
}

/// Result of a convergence pass that did not fail hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeOutcome {
    Converged(ConvergeSummary),
    /// An amend hit an order that changed state; re-tick after a short wait.
    RaceDetected,
}

/// Runs convergence passes against an exchange.
#[derive(Debug)]
pub struct ConvergenceEngine {
    relist_tolerance: Decimal,
    state: ConvergeState,
}

impl ConvergenceEngine {
    pub fn new(relist_tolerance: Decimal) -> Self {
        Self {
            relist_tolerance,
            state: ConvergeState::Done,
        }
    }

    /// Phase the last pass reached.
    pub fn state(&self) -> ConvergeState {
        self.state
    }

    pub fn relist_tolerance(&self) -> Decimal {
        self.relist_tolerance
    }

    /// Read our open orders and converge them onto `desired`.
    pub fn converge(
        &mut self,
        exchange: &dyn Exchange,
        instrument: &Instrument,
        desired: &DesiredOrders,
    ) -> ConvergeResult<ConvergeOutcome> {
        self.state = ConvergeState::Matching;
        let live = exchange.open_orders()?;
        let plan = plan(&live, desired, self.relist_tolerance);
        self.execute(exchange, instrument, &live, plan)
    }

    /// Send a precomputed plan. `live` is the snapshot it was computed from
    /// and is only used for logging.
    pub fn execute(
        &mut self,
        exchange: &dyn Exchange,
        instrument: &Instrument,
        live: &[LiveOrder],
        plan: ConvergencePlan,
    ) -> ConvergeResult<ConvergeOutcome> {
        let mut summary = ConvergeSummary::default();
        let dp = instrument.tick_log as usize;

        self.state = ConvergeState::Amending;
        if !plan.amend.is_empty() {
            for amend in plan.amend.iter().rev() {
                if let Some(reference) = live.iter().find(|o| o.order_id == amend.order_id) {
                    let new_qty = amend.total_qty - reference.cum_qty;
                    info!(
                        "Amending {:>4}: {} @ {:.*} to {} @ {:.*} ({:+.*})",
                        amend.side,
                        reference.leaves_qty,
                        dp,
                        reference.price.inner(),
                        new_qty,
                        dp,
                        amend.price.inner(),
                        dp,
                        amend.price.inner() - reference.price.inner()
                    );
                }
            }
            match exchange.amend_bulk(&plan.amend) {
                Ok(()) => summary.amended = plan.amend.len(),
                Err(ExchangeError::StaleOrder(reason)) => {
                    warn!(
                        reason = %reason,
                        "Amending failed. Waiting for order data to converge and retrying."
                    );
                    self.state = ConvergeState::Done;
                    return Ok(ConvergeOutcome::RaceDetected);
                }
                Err(e) => {
                    error!(error = %e, "Unknown error on amend. Exiting");
                    self.state = ConvergeState::Done;
                    return Err(ConvergeError::FatalAmend(e));
                }
            }
        }

        self.state = ConvergeState::Creating;
        if !plan.create.is_empty() {
            info!("Creating {} orders:", plan.create.len());
            for order in plan.create.iter().rev() {
                info!("{:>4} {} @ {:.*}", order.side, order.qty, dp, order.price.inner());
            }
            exchange.create_bulk(&plan.create)?;
            summary.created = plan.create.len();
        }

        self.state = ConvergeState::Cancelling;
        if !plan.cancel.is_empty() {
            info!("Canceling {} orders:", plan.cancel.len());
            for order in plan.cancel.iter().rev() {
                info!("{:>4} {} @ {:.*}", order.side, order.leaves_qty, dp, order.price.inner());
            }
            exchange.cancel_bulk(&plan.cancel)?;
            summary.cancelled = plan.cancel.len();
        }

        self.state = ConvergeState::Done;
        Ok(ConvergeOutcome::Converged(summary))
    }
}
