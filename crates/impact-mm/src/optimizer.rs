//! Impact-driven quote optimizer.
//!
//! For each side, scans candidate depths from mid and keeps the one that
//! maximizes `depth * P(fill)`, where the fill probability is the share of
//! recent aggressor trades large enough to push the price through that
//! depth. A resting ask is filled by buy aggressors and a resting bid by
//! sell aggressors.

use impact_core::{to_nearest, Book, Price, Side, Size};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::MakerConfig;
use crate::error::MmResult;
use crate::flow::{EmpiricalCdf, TradeFlowEstimator};
use crate::impact::{self, CriticalSize};
use crate::inventory::InventorySkew;

/// Best depth found for one side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideQuote {
    pub price: Price,
    pub depth: Decimal,
    pub ev: f64,
}

/// Optimizer output. A side is absent when it cannot be priced this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptimalQuotes {
    pub bid: Option<Price>,
    pub ask: Option<Price>,
    pub bid_depth: Option<Decimal>,
    pub ask_depth: Option<Decimal>,
    pub bid_ev: Option<f64>,
    pub ask_ev: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct QuoteOptimizer {
    granularity: Decimal,
    buffer: Decimal,
    curve_step: Size,
}

impl QuoteOptimizer {
    pub fn new(granularity: Decimal, buffer: Decimal, curve_step: Size) -> Self {
        Self {
            granularity,
            buffer,
            curve_step,
        }
    }

    pub fn from_config(config: &MakerConfig) -> Self {
        Self::new(
            config.price_granularity,
            config.anti_self_trade_buffer(),
            config.impact_curve_step,
        )
    }

    /// `half_spread` followed by multiples of the granularity up to and
    /// including `max_impact`, ascending and without duplicates.
    pub fn candidate_depths(&self, half_spread: Decimal, max_impact: Decimal) -> Vec<Decimal> {
        let mut depths = vec![half_spread];
        if self.granularity > Decimal::ZERO {
            let mut d = self.granularity;
            while d <= max_impact {
                depths.push(d);
                d += self.granularity;
            }
        }
        depths.sort();
        depths.dedup();
        depths
    }

    /// Depth with the highest expected value for a resting quote on
    /// `quote_side`, or `None` if the book cannot price it.
    pub fn optimize_side(
        &self,
        book: &Book,
        quote_side: Side,
        cdf: &EmpiricalCdf,
        max_trade: Size,
    ) -> MmResult<Option<SideQuote>> {
        let aggressor = quote_side.opposite();
        let (Some(mid), Some(half_spread)) = (impact::mid(book), impact::half_spread(book)) else {
            return Ok(None);
        };

        let curve = impact::impact_curve(book, aggressor, max_trade, self.curve_step)?;
        let Some(max_impact) = impact::max_impact(&curve) else {
            return Ok(None);
        };

        let mut best: Option<(Decimal, f64)> = None;
        for depth in self.candidate_depths(half_spread, max_impact) {
            let critical = impact::inverse_impact(book, aggressor, depth)?;
            let Some(ev) = expected_value(depth, critical, cdf) else {
                continue;
            };
            // Strict: ties keep the shallower depth.
            if best.map_or(true, |(_, best_ev)| ev > best_ev) {
                best = Some((depth, ev));
            }
        }

        let Some((depth, ev)) = best else {
            return Ok(None);
        };

        let offset = to_nearest(depth, self.granularity) + self.buffer;
        let raw = match quote_side {
            Side::Buy => mid.inner() - offset,
            Side::Sell => mid.inner() + offset,
        };

        debug!(
            side = %quote_side,
            depth = %depth,
            ev,
            max_impact = %max_impact,
            "Optimal depth"
        );

        Ok(Some(SideQuote {
            price: Price::new(raw),
            depth,
            ev,
        }))
    }

    /// Raw optimal pair snapped to `tick`, before inventory skew.
    ///
    /// Returns `None` while the flow window is too thin.
    pub fn optimize(
        &self,
        book: &Book,
        flow: &TradeFlowEstimator,
        tick: Price,
    ) -> MmResult<Option<OptimalQuotes>> {
        let (Some(buy_cdf), Some(sell_cdf)) =
            (flow.empirical_cdf(Side::Buy), flow.empirical_cdf(Side::Sell))
        else {
            return Ok(None);
        };

        // Asks are lifted by buy aggressors, bids hit by sell aggressors.
        let ask = match flow.max_size(Side::Buy) {
            Some(max) => self.optimize_side(book, Side::Sell, &buy_cdf, max)?,
            None => None,
        };
        let bid = match flow.max_size(Side::Sell) {
            Some(max) => self.optimize_side(book, Side::Buy, &sell_cdf, max)?,
            None => None,
        };

        Ok(Some(OptimalQuotes {
            bid: bid.map(|q| q.price.to_tick(tick)),
            ask: ask.map(|q| q.price.to_tick(tick)),
            bid_depth: bid.map(|q| q.depth),
            ask_depth: ask.map(|q| q.depth),
            bid_ev: bid.map(|q| q.ev),
            ask_ev: ask.map(|q| q.ev),
        }))
    }

    /// Optimal pair with inventory skew applied.
    pub fn quote(
        &self,
        book: &Book,
        flow: &TradeFlowEstimator,
        tick: Price,
        skew: &InventorySkew,
        position: i64,
    ) -> MmResult<Option<OptimalQuotes>> {
        let Some(raw) = self.optimize(book, flow, tick)? else {
            return Ok(None);
        };
        let (bid, ask) = skew.apply(raw.bid, raw.ask, position, book.top_of_book())?;
        Ok(Some(OptimalQuotes { bid, ask, ..raw }))
    }
}

/// `depth * (1 - cdf(critical))`; `None` if the depth is not representable.
fn expected_value(depth: Decimal, critical: CriticalSize, cdf: &EmpiricalCdf) -> Option<f64> {
    let fill_prob = 1.0 - cdf.cdf(critical);
    let ev = depth.to_f64()? * fill_prob;
    ev.is_finite().then_some(ev)
}
