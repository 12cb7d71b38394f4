//! Order-related types and identifiers.
//!
//! Provides the side tag shared by book levels, trades and orders, and the
//! three order records the convergence engine works with:
//! - `DesiredOrder`: what the strategy wants resting this tick
//! - `LiveOrder`: read snapshot of what is resting on the exchange
//! - `Amendment`: instruction to move a live order onto a desired one

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Price, Size};

/// Side: buy or sell.
///
/// For book levels `Buy` is the bid side and `Sell` the ask side; for trades
/// it is the aggressor's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.pad("Buy"),
            Self::Sell => f.pad("Sell"),
        }
    }
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new unique order ID.
    ///
    /// Format: `imm_{timestamp_ms}_{uuid_short}`
    pub fn generate() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("imm_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An order the strategy wants resting. Produced fresh every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredOrder {
    pub side: Side,
    pub price: Price,
    pub qty: Size,
}

impl DesiredOrder {
    pub fn new(side: Side, price: Price, qty: Size) -> Self {
        Self { side, price, qty }
    }
}

/// Read snapshot of a resting order as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    /// Quantity still resting.
    pub leaves_qty: Size,
    /// Quantity already filled.
    pub cum_qty: Size,
}

/// Amend instruction for a live order.
///
/// `total_qty` is the new order quantity including what has already filled,
/// so the exchange leaves `total_qty - cum_qty` resting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub total_qty: Size,
}

impl Amendment {
    /// Build the amendment that moves `live` onto `desired`, preserving the
    /// filled quantity.
    #[must_use]
    pub fn from_live(live: &LiveOrder, desired: &DesiredOrder) -> Self {
        Self {
            order_id: live.order_id.clone(),
            side: live.side,
            price: desired.price,
            total_qty: live.cum_qty + desired.qty,
        }
    }
}

/// The full desired order set for one tick.
///
/// Each side is stored outermost-first so that the nearest-to-market order
/// is last; the convergence engine matches live orders against it in that
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredOrders {
    pub buys: Vec<DesiredOrder>,
    pub sells: Vec<DesiredOrder>,
}

impl DesiredOrders {
    pub fn new(buys: Vec<DesiredOrder>, sells: Vec<DesiredOrder>) -> Self {
        Self { buys, sells }
    }

    pub fn side(&self, side: Side) -> &[DesiredOrder] {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buys.len() + self.sells.len()
    }
}
