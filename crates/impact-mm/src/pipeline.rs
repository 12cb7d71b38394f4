//! Staged quote pipeline.
//!
//! An ordered list of stages, each reading the tick snapshot and writing
//! into a shared mutable context, then flushed into `DesiredOrders`. A stage
//! failure drops that tick's output and is logged; the pipeline itself stays
//! usable for the next tick.

use impact_core::{BookLevel, DesiredOrder, DesiredOrders, Side, Size};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{MmError, MmResult};
use crate::impact::cumulative_qty;
use crate::limits::{LimitFlags, PositionLimitGuard};
use crate::strategy::TickState;

/// Mutable state threaded through the stages for one tick.
#[derive(Debug)]
pub struct QuoteContext<'a> {
    pub state: &'a TickState<'a>,
    pub limits: LimitFlags,
    pub buy_orders: Vec<DesiredOrder>,
    pub sell_orders: Vec<DesiredOrder>,
}

impl<'a> QuoteContext<'a> {
    pub fn new(state: &'a TickState<'a>) -> Self {
        Self {
            state,
            limits: state.limits,
            buy_orders: Vec::new(),
            sell_orders: Vec::new(),
        }
    }

    pub fn flush(self) -> DesiredOrders {
        DesiredOrders::new(self.buy_orders, self.sell_orders)
    }
}

/// One step of the pipeline.
pub trait QuoteStage: Send {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &mut QuoteContext<'_>) -> MmResult<()>;
}

#[derive(Default)]
pub struct QuotePipeline {
    stages: Vec<Box<dyn QuoteStage>>,
}

impl QuotePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stage(mut self, stage: impl QuoteStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage and flush. Returns `None` if a stage failed.
    pub fn run(&self, state: &TickState<'_>) -> Option<DesiredOrders> {
        let mut ctx = QuoteContext::new(state);
        for stage in &self.stages {
            if let Err(e) = stage.apply(&mut ctx) {
                warn!(stage = stage.name(), error = %e, "Quote stage failed, dropping tick output");
                return None;
            }
        }
        Some(ctx.flush())
    }
}

impl std::fmt::Debug for QuotePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("QuotePipeline").field("stages", &names).finish()
    }
}

/// Recomputes the limit flags from the tick's position.
#[derive(Debug, Clone, Copy)]
pub struct PositionLimitStage {
    guard: PositionLimitGuard,
}

impl PositionLimitStage {
    pub fn new(guard: PositionLimitGuard) -> Self {
        Self { guard }
    }
}

impl QuoteStage for PositionLimitStage {
    fn name(&self) -> &'static str {
        "position_limits"
    }

    fn apply(&self, ctx: &mut QuoteContext<'_>) -> MmResult<()> {
        ctx.limits = self.guard.flags(ctx.state.position);
        Ok(())
    }
}

/// Places one order on `side` in front of the edge level.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSideStage {
    side: Side,
    qty: Size,
}

impl EdgeSideStage {
    pub fn new(side: Side, qty: Size) -> Self {
        Self { side, qty }
    }

    fn stage_name(side: Side) -> &'static str {
        match side {
            Side::Buy => "edge_buy",
            Side::Sell => "edge_sell",
        }
    }
}

impl QuoteStage for EdgeSideStage {
    fn name(&self) -> &'static str {
        Self::stage_name(self.side)
    }

    fn apply(&self, ctx: &mut QuoteContext<'_>) -> MmResult<()> {
        let blocked = match self.side {
            Side::Buy => ctx.limits.long_exceeded,
            Side::Sell => ctx.limits.short_exceeded,
        };
        if blocked {
            return Ok(());
        }

        let levels = ctx.state.book.side(self.side);
        let edge = edge_level(levels).ok_or_else(|| MmError::StageFailed {
            stage: self.name(),
            reason: format!("{} side has {} levels, need at least 2", self.side, levels.len()),
        })?;

        let order = DesiredOrder::new(self.side, levels[edge].price, self.qty);
        match self.side {
            Side::Buy => ctx.buy_orders = vec![order],
            Side::Sell => ctx.sell_orders = vec![order],
        }
        Ok(())
    }
}

/// Index of the level one in front of the first level (excluding the touch)
/// with the largest `size / cumulative size` ratio.
///
/// Levels must be ordered best first. Needs at least two levels.
pub fn edge_level(levels: &[BookLevel]) -> Option<usize> {
    if levels.len() < 2 {
        return None;
    }
    let cumulative = cumulative_qty(levels);
    let mut best: Option<(usize, Decimal)> = None;
    for i in 1..levels.len() {
        let cum = cumulative[i].inner();
        if cum.is_zero() {
            continue;
        }
        let ratio = levels[i].size.inner() / cum;
        if best.map_or(true, |(_, r)| ratio > r) {
            best = Some((i, ratio));
        }
    }
    best.map(|(i, _)| i - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::TradeFlowEstimator;
    use crate::ladder::StartPrices;
    use impact_core::{Book, Instrument, Price, Ticker};
    use rust_decimal_macros::dec;

    fn p(v: Decimal) -> Price {
        Price::new(v)
    }

    fn book() -> Book {
        Book::from_sides(
            &[
                (p(dec!(100.0)), Size::from(10)),
                (p(dec!(99.5)), Size::from(5)),
                (p(dec!(99.0)), Size::from(300)),
                (p(dec!(98.5)), Size::from(20)),
            ],
            &[
                (p(dec!(100.5)), Size::from(10)),
                (p(dec!(101.0)), Size::from(100)),
                (p(dec!(101.5)), Size::from(20)),
            ],
        )
        .unwrap()
    }

    struct Fixture {
        book: Book,
        ticker: Ticker,
        start: StartPrices,
        instrument: Instrument,
        flow: TradeFlowEstimator,
    }

    impl Fixture {
        fn new(book: Book) -> Self {
            Self {
                book,
                ticker: Ticker::new(p(dec!(100)), p(dec!(100.5))),
                start: StartPrices {
                    buy: p(dec!(100)),
                    sell: p(dec!(100.5)),
                    mid: p(dec!(100.25)),
                },
                instrument: Instrument::new("XBTUSD", p(dec!(0.5))).unwrap(),
                flow: TradeFlowEstimator::new(10),
            }
        }

        fn state(&self, position: i64) -> TickState<'_> {
            TickState {
                book: &self.book,
                ticker: &self.ticker,
                start: &self.start,
                instrument: &self.instrument,
                position,
                live_orders: &[],
                flow: &self.flow,
                limits: LimitFlags::default(),
            }
        }
    }

    fn pipeline(guard: PositionLimitGuard) -> QuotePipeline {
        QuotePipeline::new()
            .with_stage(PositionLimitStage::new(guard))
            .with_stage(EdgeSideStage::new(Side::Buy, Size::from(100)))
            .with_stage(EdgeSideStage::new(Side::Sell, Size::from(100)))
    }

    #[test]
    fn test_edge_level() {
        let b = book();
        // Bids ratios from index 1: 5/15, 300/315, 20/335 -> index 2, quote index 1.
        assert_eq!(edge_level(b.bid_side()), Some(1));
        // Asks ratios: 100/110, 20/130 -> index 1, quote index 0.
        assert_eq!(edge_level(b.ask_side()), Some(0));
        assert_eq!(edge_level(&b.ask_side()[..1]), None);
    }

    #[test]
    fn test_pipeline_quotes_in_front_of_edge() {
        let fx = Fixture::new(book());
        let orders = pipeline(PositionLimitGuard::new(false, -10, 10))
            .run(&fx.state(0))
            .unwrap();
        assert_eq!(orders.buys, vec![DesiredOrder::new(Side::Buy, p(dec!(99.5)), Size::from(100))]);
        assert_eq!(orders.sells, vec![DesiredOrder::new(Side::Sell, p(dec!(100.5)), Size::from(100))]);
    }

    #[test]
    fn test_pipeline_limit_stage_blocks_side() {
        let fx = Fixture::new(book());
        let orders = pipeline(PositionLimitGuard::new(true, -10, 10))
            .run(&fx.state(10))
            .unwrap();
        assert!(orders.buys.is_empty());
        assert_eq!(orders.sells.len(), 1);
    }

    #[test]
    fn test_stage_failure_drops_output_and_pipeline_survives() {
        let thin = Book::from_sides(&[(p(dec!(100)), Size::from(1))], &[(p(dec!(100.5)), Size::from(1))])
            .unwrap();
        let pipe = pipeline(PositionLimitGuard::new(false, -10, 10));

        let fx = Fixture::new(thin);
        assert!(pipe.run(&fx.state(0)).is_none());

        let fx = Fixture::new(book());
        assert!(pipe.run(&fx.state(0)).is_some());
        assert_eq!(pipe.len(), 3);
    }
}
