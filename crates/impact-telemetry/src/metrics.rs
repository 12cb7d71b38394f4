//! Prometheus metrics for the impact market maker.
//!
//! Registered in the default registry on first use. Nothing here serves
//! them; [`Metrics::render`] returns the text exposition for whoever wants it.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error that should crash at
//! startup. It can only happen during lazy static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, GaugeVec, IntCounter, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Ticks by outcome.
/// Labels: outcome (converged/skipped/race/restart/fatal)
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "impact_ticks_total",
        "Total order manager ticks by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Order mutations sent.
/// Labels: action (amend/create/cancel)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "impact_orders_total",
        "Total order mutations sent to the exchange",
        &["action"]
    )
    .unwrap()
});

/// Stale-order amend races.
pub static RACE_RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "impact_race_retries_total",
        "Total amend races retried after a delay"
    )
    .unwrap()
});

/// Sanity check failures.
/// Labels: reason (orderbook_empty/market_closed/crossed/other)
pub static SANITY_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "impact_sanity_failures_total",
        "Total sanity check failures",
        &["reason"]
    )
    .unwrap()
});

/// Signed position in contracts.
pub static POSITION: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("impact_position_contracts", "Signed net position").unwrap()
});

/// Last impact-optimal quote.
/// Labels: side (bid/ask)
pub static OPTIMAL_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "impact_optimal_price",
        "Last impact-optimal quote price",
        &["side"]
    )
    .unwrap()
});

/// Trade arrival rate per second.
/// Labels: side (buy/sell)
pub static ARRIVAL_RATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "impact_trade_arrival_rate",
        "Estimated trade arrivals per second by aggressor side",
        &["side"]
    )
    .unwrap()
});

/// Trade size rate (diagnostic).
/// Labels: side (buy/sell)
pub static SIZE_RATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "impact_trade_size_rate",
        "Estimated exponential rate of trade sizes by aggressor side",
        &["side"]
    )
    .unwrap()
});

/// Trades held in the flow window.
pub static TRADE_WINDOW_LEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("impact_trade_window_len", "Trades in the flow window").unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a finished tick.
    pub fn tick(outcome: &str) {
        TICKS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record mutations sent in one convergence pass.
    pub fn orders(amended: usize, created: usize, cancelled: usize) {
        ORDERS_TOTAL
            .with_label_values(&["amend"])
            .inc_by(amended as f64);
        ORDERS_TOTAL
            .with_label_values(&["create"])
            .inc_by(created as f64);
        ORDERS_TOTAL
            .with_label_values(&["cancel"])
            .inc_by(cancelled as f64);
    }

    pub fn race_retry() {
        RACE_RETRIES_TOTAL.inc();
    }

    pub fn sanity_failure(reason: &str) {
        SANITY_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn position(qty: i64) {
        POSITION.set(qty);
    }

    /// Update the optimal quote gauge for `side` ("bid" or "ask").
    pub fn optimal_price(side: &str, price: f64) {
        OPTIMAL_PRICE.with_label_values(&[side]).set(price);
    }

    /// Update flow estimates for `side` ("buy" or "sell").
    pub fn flow_rates(side: &str, arrival_rate: f64, size_rate: f64) {
        ARRIVAL_RATE.with_label_values(&[side]).set(arrival_rate);
        SIZE_RATE.with_label_values(&[side]).set(size_rate);
    }

    pub fn trade_window_len(len: usize) {
        TRADE_WINDOW_LEN.set(len as i64);
    }

    /// Text exposition of every registered metric.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
