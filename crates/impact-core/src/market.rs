//! Instrument and account snapshot records.
//!
//! These are the read-only values the exchange collaborator hands the engine
//! every tick: the instrument being quoted, its ticker, margin and position.

use crate::{CoreError, Price, Result, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The instrument being quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Number of decimals used when displaying prices.
    pub tick_log: u32,
}

impl Instrument {
    /// Create an instrument, deriving `tick_log` from the tick size.
    pub fn new(symbol: impl Into<String>, tick_size: Price) -> Result<Self> {
        if !tick_size.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "tick size must be positive, got {tick_size}"
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            tick_size,
            tick_log: tick_size.inner().normalize().scale(),
        })
    }

    /// Format a price with the instrument's display precision.
    pub fn format_price(&self, price: Price) -> String {
        format!("{:.*}", self.tick_log as usize, price.inner())
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (tick {})", self.symbol, self.tick_size)
    }
}

/// Best buy/sell with the derived mid.
///
/// `buy` and `sell` are the prices a maker would improve on: the best bid and
/// best ask, corrected so that our own resting orders at the touch are not
/// mistaken for other participants'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub buy: Price,
    pub sell: Price,
    pub mid: Price,
}

impl Ticker {
    /// Build a ticker; `mid` is the arithmetic mean of `buy` and `sell`.
    pub fn new(buy: Price, sell: Price) -> Self {
        Self {
            buy,
            sell,
            mid: Price::new((buy.inner() + sell.inner()) / Decimal::TWO),
        }
    }

    /// True if the buy side is at or above the sell side.
    pub fn is_crossed(&self) -> bool {
        self.buy >= self.sell
    }

    pub fn spread(&self) -> Decimal {
        self.sell.inner() - self.buy.inner()
    }
}

/// Margin summary, logged once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margin {
    pub wallet_balance: Decimal,
    pub margin_balance: Decimal,
    pub available_margin: Decimal,
}

/// Position snapshot for the quoted instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionInfo {
    /// Signed net contracts.
    pub current_qty: i64,
    /// Average entry price, absent when flat.
    pub avg_entry_price: Option<Price>,
}

impl PositionInfo {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.current_qty == 0
    }

    /// Absolute size of the position.
    pub fn abs_size(&self) -> Size {
        Size::from(self.current_qty.abs())
    }
}
