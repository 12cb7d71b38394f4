//! Quoting strategies.
//!
//! A strategy turns one tick's market snapshot into the full set of orders
//! it wants resting. The order manager owns a `Box<dyn Strategy>` and feeds
//! its output to the convergence engine.

use impact_core::{Book, DesiredOrder, DesiredOrders, Instrument, LiveOrder, Price, Side, Size, Ticker};
use tracing::{debug, info};

use crate::config::{MakerConfig, StrategyKind};
use crate::error::MmResult;
use crate::flow::TradeFlowEstimator;
use crate::inventory::InventorySkew;
use crate::ladder::{StartPrices, StaticLadder};
use crate::limits::{LimitFlags, PositionLimitGuard};
use crate::optimizer::{OptimalQuotes, QuoteOptimizer};
use crate::pipeline::{EdgeSideStage, PositionLimitStage, QuotePipeline};

/// Everything a strategy may look at for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickState<'a> {
    pub book: &'a Book,
    pub ticker: &'a Ticker,
    pub start: &'a StartPrices,
    pub instrument: &'a Instrument,
    pub position: i64,
    pub live_orders: &'a [LiveOrder],
    pub flow: &'a TradeFlowEstimator,
    pub limits: LimitFlags,
}

impl TickState<'_> {
    /// Highest price among our own resting buys.
    pub fn own_highest_buy(&self) -> Option<Price> {
        own_extreme(self.live_orders, Side::Buy)
    }

    /// Lowest price among our own resting sells.
    pub fn own_lowest_sell(&self) -> Option<Price> {
        own_extreme(self.live_orders, Side::Sell)
    }
}

fn own_extreme(orders: &[LiveOrder], side: Side) -> Option<Price> {
    let prices = orders.iter().filter(|o| o.side == side).map(|o| o.price);
    match side {
        Side::Buy => prices.max(),
        Side::Sell => prices.min(),
    }
}

/// A quoting strategy.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Desired orders for this tick. `Ok(None)` skips convergence.
    fn decide(&mut self, state: &TickState<'_>) -> MmResult<Option<DesiredOrders>>;

    /// Last impact-optimal quotes, if the strategy computes them.
    fn last_quotes(&self) -> Option<OptimalQuotes> {
        None
    }
}

/// Build the strategy selected in configuration.
pub fn build_strategy(kind: StrategyKind, config: &MakerConfig) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Impact => Box::new(ImpactStrategy::new(config)),
        StrategyKind::StaticLadder => Box::new(StaticLadderStrategy::new(config)),
        StrategyKind::EdgePrice => Box::new(EdgePriceStrategy::new(config)),
    }
}

/// Geometric ladder around the ticker.
#[derive(Debug)]
pub struct StaticLadderStrategy {
    ladder: StaticLadder,
}

impl StaticLadderStrategy {
    pub fn new(config: &MakerConfig) -> Self {
        Self {
            ladder: StaticLadder::from_config(config),
        }
    }

    pub fn with_ladder(ladder: StaticLadder) -> Self {
        Self { ladder }
    }
}

impl Strategy for StaticLadderStrategy {
    fn name(&self) -> &'static str {
        "static_ladder"
    }

    fn decide(&mut self, state: &TickState<'_>) -> MmResult<Option<DesiredOrders>> {
        let orders = self
            .ladder
            .build(state.start, state.instrument.tick_size, state.limits)?;
        Ok(Some(orders))
    }
}

/// One order per side at the impact-optimal price, skewed by inventory.
///
/// Falls back to the static ladder until the trade window holds enough
/// samples, or when neither side can be priced.
#[derive(Debug)]
pub struct ImpactStrategy {
    optimizer: QuoteOptimizer,
    neutral: Size,
    step: Size,
    fallback: StaticLadderStrategy,
    last: Option<OptimalQuotes>,
}

impl ImpactStrategy {
    pub fn new(config: &MakerConfig) -> Self {
        Self {
            optimizer: QuoteOptimizer::from_config(config),
            neutral: config.inventory_neutral_size(),
            step: config.order_step_size,
            fallback: StaticLadderStrategy::new(config),
            last: None,
        }
    }
}

impl Strategy for ImpactStrategy {
    fn name(&self) -> &'static str {
        "impact"
    }

    fn decide(&mut self, state: &TickState<'_>) -> MmResult<Option<DesiredOrders>> {
        if !state.flow.has_sufficient_samples() {
            debug!(
                trades = state.flow.window().len(),
                "Not enough trade flow, using static ladder"
            );
            return self.fallback.decide(state);
        }

        let tick = state.instrument.tick_size;
        let skew = InventorySkew::new(self.neutral, self.step, tick)?;
        let Some(quotes) = self
            .optimizer
            .quote(state.book, state.flow, tick, &skew, state.position)?
        else {
            return self.fallback.decide(state);
        };

        if quotes.bid.is_none() && quotes.ask.is_none() {
            debug!("No side could be priced, using static ladder");
            return self.fallback.decide(state);
        }

        info!(
            optimal_bid = ?quotes.bid.map(|p| p.inner()),
            optimal_ask = ?quotes.ask.map(|p| p.inner()),
            bid_depth = ?quotes.bid_depth,
            ask_depth = ?quotes.ask_depth,
            position = state.position,
            "Optimal quotes"
        );
        self.last = Some(quotes);

        let mut orders = DesiredOrders::default();
        if let (Some(bid), false) = (quotes.bid, state.limits.long_exceeded) {
            orders.buys.push(DesiredOrder::new(Side::Buy, bid, self.step));
        }
        if let (Some(ask), false) = (quotes.ask, state.limits.short_exceeded) {
            orders.sells.push(DesiredOrder::new(Side::Sell, ask, self.step));
        }
        Ok(Some(orders))
    }

    fn last_quotes(&self) -> Option<OptimalQuotes> {
        self.last
    }
}

/// Quotes one level in front of the level with the largest size relative
/// to the depth ahead of it.
pub struct EdgePriceStrategy {
    pipeline: QuotePipeline,
}

impl EdgePriceStrategy {
    pub fn new(config: &MakerConfig) -> Self {
        let pipeline = QuotePipeline::new()
            .with_stage(PositionLimitStage::new(PositionLimitGuard::from_config(config)))
            .with_stage(EdgeSideStage::new(Side::Buy, config.order_step_size))
            .with_stage(EdgeSideStage::new(Side::Sell, config.order_step_size));
        Self { pipeline }
    }
}

impl Strategy for EdgePriceStrategy {
    fn name(&self) -> &'static str {
        "edge_price"
    }

    fn decide(&mut self, state: &TickState<'_>) -> MmResult<Option<DesiredOrders>> {
        Ok(self.pipeline.run(state))
    }
}
