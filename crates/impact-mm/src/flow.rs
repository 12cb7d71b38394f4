//! Trade flow statistics.
//!
//! Keeps a bounded window of recent public trades, deduplicated by match id,
//! and derives per-side statistics from it:
//! - empirical CDF of aggressor sizes (fill probability of a resting quote)
//! - exponential arrival-rate estimate
//! - size-rate estimate (diagnostic only)

use std::collections::{HashSet, VecDeque};

use impact_core::{Side, Size, Trade};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

use crate::impact::CriticalSize;

/// Observations required on each side before statistics are trusted.
pub const MIN_SAMPLES_PER_SIDE: usize = 10;
/// Observations required in total before statistics are trusted.
pub const MIN_SAMPLES_TOTAL: usize = 20;

/// Below this sum of gaps the rate estimate is treated as undefined.
const RATE_EPSILON: f64 = 1e-5;

/// Fixed-capacity FIFO of trades, unique by match id.
#[derive(Debug)]
pub struct TradeWindow {
    trades: VecDeque<Trade>,
    ids: HashSet<String>,
    capacity: usize,
}

impl TradeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a trade unless its match id is already held.
    ///
    /// Returns true if the trade was added.
    pub fn push(&mut self, trade: Trade) -> bool {
        if self.capacity == 0 || self.ids.contains(&trade.match_id) {
            return false;
        }
        while self.trades.len() >= self.capacity {
            if let Some(evicted) = self.trades.pop_front() {
                self.ids.remove(&evicted.match_id);
            }
        }
        self.ids.insert(trade.match_id.clone());
        self.trades.push_back(trade);
        true
    }

    pub fn contains(&self, match_id: &str) -> bool {
        self.ids.contains(match_id)
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    /// Trades with aggressor `side`, oldest first.
    pub fn side(&self, side: Side) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(move |t| t.side == side)
    }
}

/// Empirical distribution of trade sizes on one side.
#[derive(Debug, Clone)]
pub struct EmpiricalCdf {
    sorted: Vec<Size>,
}

impl EmpiricalCdf {
    pub fn new(mut sizes: Vec<Size>) -> Self {
        sizes.sort();
        Self { sorted: sizes }
    }

    /// Fraction of observations `<= x`. Always 1 for an infinite size.
    pub fn cdf(&self, x: CriticalSize) -> f64 {
        match x {
            CriticalSize::Infinite => 1.0,
            CriticalSize::Finite(size) => {
                if self.sorted.is_empty() {
                    return 0.0;
                }
                let at_or_below = self.sorted.partition_point(|s| *s <= size);
                at_or_below as f64 / self.sorted.len() as f64
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn max(&self) -> Option<Size> {
        self.sorted.last().copied()
    }
}

/// Unbiased rate estimate for exponential inter-arrival gaps.
///
/// `n <= 2` or a near-zero sum gives 0, otherwise `(n - 2) / sum`.
pub fn exponential_rate(gaps: &[f64]) -> f64 {
    let n = gaps.len();
    if n <= 2 {
        return 0.0;
    }
    let total: f64 = gaps.iter().sum();
    if total.abs() < RATE_EPSILON {
        return 0.0;
    }
    (n as f64 - 2.0) / total
}

/// Per-tick summary of the flow window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSnapshot {
    pub buy_count: usize,
    pub sell_count: usize,
    pub buy_arrival_rate: f64,
    pub sell_arrival_rate: f64,
    pub buy_size_rate: f64,
    pub sell_size_rate: f64,
    pub max_buy_size: Option<Size>,
    pub max_sell_size: Option<Size>,
    pub sufficient: bool,
}

/// Trade flow estimator over a deduplicated window.
#[derive(Debug)]
pub struct TradeFlowEstimator {
    window: TradeWindow,
}

impl TradeFlowEstimator {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: TradeWindow::new(capacity),
        }
    }

    /// Add trades not yet seen. Returns the number added.
    pub fn ingest(&mut self, trades: impl IntoIterator<Item = Trade>) -> usize {
        let mut added = 0;
        for trade in trades {
            if self.window.push(trade) {
                added += 1;
            }
        }
        if added > 0 {
            debug!(added, window = self.window.len(), "Ingested trades");
        }
        added
    }

    pub fn window(&self) -> &TradeWindow {
        &self.window
    }

    pub fn count(&self, side: Side) -> usize {
        self.window.side(side).count()
    }

    /// More than 10 trades per side and more than 20 overall.
    pub fn has_sufficient_samples(&self) -> bool {
        self.count(Side::Buy) > MIN_SAMPLES_PER_SIDE
            && self.count(Side::Sell) > MIN_SAMPLES_PER_SIDE
            && self.window.len() > MIN_SAMPLES_TOTAL
    }

    /// Size CDF for aggressors of `side`, once there are enough samples.
    pub fn empirical_cdf(&self, side: Side) -> Option<EmpiricalCdf> {
        if !self.has_sufficient_samples() {
            return None;
        }
        Some(EmpiricalCdf::new(self.sizes(side)))
    }

    /// Largest windowed trade size of `side`.
    pub fn max_size(&self, side: Side) -> Option<Size> {
        self.window.side(side).map(|t| t.size).max()
    }

    /// Arrival rate (trades per second) for aggressors of `side`.
    pub fn arrival_rate(&self, side: Side) -> f64 {
        let mut stamps: Vec<f64> = self.window.side(side).map(|t| t.timestamp_secs()).collect();
        stamps.sort_by(|a, b| a.total_cmp(b));
        let gaps: Vec<f64> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        exponential_rate(&gaps)
    }

    /// The same estimator applied to trade sizes. Diagnostic only.
    pub fn size_rate(&self, side: Side) -> f64 {
        let sizes: Vec<f64> = self
            .window
            .side(side)
            .filter_map(|t| t.size.inner().to_f64())
            .collect();
        exponential_rate(&sizes)
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            buy_count: self.count(Side::Buy),
            sell_count: self.count(Side::Sell),
            buy_arrival_rate: self.arrival_rate(Side::Buy),
            sell_arrival_rate: self.arrival_rate(Side::Sell),
            buy_size_rate: self.size_rate(Side::Buy),
            sell_size_rate: self.size_rate(Side::Sell),
            max_buy_size: self.max_size(Side::Buy),
            max_sell_size: self.max_size(Side::Sell),
            sufficient: self.has_sufficient_samples(),
        }
    }

    /// Log the snapshot at info level and return it.
    pub fn log_snapshot(&self) -> FlowSnapshot {
        let snap = self.snapshot();
        info!(
            trades = self.window.len(),
            buys = snap.buy_count,
            sells = snap.sell_count,
            buy_arrival_rate = snap.buy_arrival_rate,
            sell_arrival_rate = snap.sell_arrival_rate,
            buy_size_rate = snap.buy_size_rate,
            sell_size_rate = snap.sell_size_rate,
            sufficient = snap.sufficient,
            "Trade flow"
        );
        snap
    }

    fn sizes(&self, side: Side) -> Vec<Size> {
        self.window.side(side).map(|t| t.size).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn trade(side: Side, size: i64, ms: i64, id: &str) -> Trade {
        Trade::new(side, Size::from(size), Utc.timestamp_millis_opt(ms).unwrap(), id)
    }

    fn filled_estimator(buys: usize, sells: usize) -> TradeFlowEstimator {
        let mut est = TradeFlowEstimator::new(200);
        let trades = (0..buys)
            .map(|i| trade(Side::Buy, 10 * (i as i64 + 1), i as i64 * 1000, &format!("b{i}")))
            .chain((0..sells).map(|i| {
                trade(Side::Sell, 5 * (i as i64 + 1), i as i64 * 500, &format!("s{i}"))
            }));
        est.ingest(trades);
        est
    }

    #[test]
    fn test_window_dedup_by_match_id() {
        let mut window = TradeWindow::new(10);
        assert!(window.push(trade(Side::Buy, 1, 0, "a")));
        assert!(!window.push(trade(Side::Sell, 2, 1, "a")));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = TradeWindow::new(3);
        for i in 0..5 {
            window.push(trade(Side::Buy, i, i, &format!("t{i}")));
        }
        assert_eq!(window.len(), 3);
        assert!(!window.contains("t0"));
        assert!(!window.contains("t1"));
        assert!(window.contains("t4"));
        // Evicted ids may be re-admitted.
        assert!(window.push(trade(Side::Buy, 0, 0, "t0")));
        assert!(!window.contains("t2"));
    }

    #[test]
    fn test_ingest_counts_only_new() {
        let mut est = TradeFlowEstimator::new(200);
        let batch = vec![trade(Side::Buy, 1, 0, "a"), trade(Side::Sell, 1, 0, "b")];
        assert_eq!(est.ingest(batch.clone()), 2);
        assert_eq!(est.ingest(batch), 0);
        assert_eq!(est.window().len(), 2);
    }

    #[test]
    fn test_sufficiency_threshold() {
        assert!(!filled_estimator(10, 11).has_sufficient_samples());
        assert!(!filled_estimator(11, 10).has_sufficient_samples());
        assert!(filled_estimator(11, 11).has_sufficient_samples());
        assert!(filled_estimator(11, 11).empirical_cdf(Side::Buy).is_some());
        assert!(filled_estimator(5, 30).empirical_cdf(Side::Sell).is_none());
    }

    #[test]
    fn test_empirical_cdf() {
        let cdf = EmpiricalCdf::new(vec![Size::from(30), Size::from(10), Size::from(20), Size::from(20)]);
        assert_eq!(cdf.cdf(CriticalSize::Finite(Size::from(5))), 0.0);
        assert_eq!(cdf.cdf(CriticalSize::Finite(Size::from(10))), 0.25);
        assert_eq!(cdf.cdf(CriticalSize::Finite(Size::from(20))), 0.75);
        assert_eq!(cdf.cdf(CriticalSize::Finite(Size::from(100))), 1.0);
        assert_eq!(cdf.cdf(CriticalSize::Infinite), 1.0);
        assert_eq!(cdf.max(), Some(Size::from(30)));
    }

    #[test]
    fn test_exponential_rate() {
        assert_eq!(exponential_rate(&[]), 0.0);
        assert_eq!(exponential_rate(&[1.0, 1.0]), 0.0);
        assert_eq!(exponential_rate(&[0.0, 0.0, 0.0]), 0.0);
        assert!((exponential_rate(&[1.0, 2.0, 1.0, 1.0]) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_arrival_rate_uses_sorted_gaps() {
        let mut est = TradeFlowEstimator::new(200);
        // Out of order on purpose; gaps after sorting are all 1s.
        est.ingest(vec![
            trade(Side::Buy, 1, 3000, "c"),
            trade(Side::Buy, 1, 0, "a"),
            trade(Side::Buy, 1, 4000, "d"),
            trade(Side::Buy, 1, 1000, "b"),
            trade(Side::Buy, 1, 2000, "e"),
        ]);
        // 4 gaps summing to 4s: (4 - 2) / 4
        assert!((est.arrival_rate(Side::Buy) - 0.5).abs() < 1e-9);
        assert_eq!(est.arrival_rate(Side::Sell), 0.0);
    }

    #[test]
    fn test_snapshot() {
        let est = filled_estimator(11, 12);
        let snap = est.snapshot();
        assert_eq!(snap.buy_count, 11);
        assert_eq!(snap.sell_count, 12);
        assert_eq!(snap.max_buy_size, Some(Size::from(110)));
        assert_eq!(snap.max_sell_size, Some(Size::from(60)));
        assert!(snap.sufficient);
        assert!(snap.buy_arrival_rate > 0.0);
    }
}
