//! Inventory skew for market making.
//!
//! Shifts the raw optimal quotes in whole ticks as net position grows, so a
//! long book bids lower (and eventually offers tighter) and a short book
//! offers higher. Positions are bucketed into bands of width `2 * band`
//! outside a neutral zone `[-neutral, neutral]`:
//!
//! ```text
//! position              bid                      ask
//! (n, n+2s]             bid - 1t                 ask
//! (n+2s, n+4s]          bid - 2t                 ask
//! (n+4s, n+6s]          bid - 3t                 max(ask - 1t, best_ask)
//! > n+6s                bid - 4t                 max(ask - 2t, best_ask)
//! ```
//!
//! Short positions mirror the table.

use impact_core::{Price, Size, TopOfBook};
use rust_decimal::Decimal;

use crate::error::{MmError, MmResult};

/// Number of outer bands on each side of the neutral zone.
const MAX_BAND: i64 = 4;

/// Inventory skew parameters.
#[derive(Debug, Clone, Copy)]
pub struct InventorySkew {
    neutral: Decimal,
    band: Decimal,
    tick: Decimal,
}

impl InventorySkew {
    /// `neutral` is the half-width of the zone left untouched, `band` the
    /// step between bands and `tick` the shift unit.
    pub fn new(neutral: Size, band: Size, tick: Price) -> MmResult<Self> {
        if neutral.is_negative() {
            return Err(MmError::InvalidArgument(format!(
                "neutral zone must not be negative, got {neutral}"
            )));
        }
        if !band.is_positive() {
            return Err(MmError::InvalidArgument(format!(
                "inventory band must be positive, got {band}"
            )));
        }
        if !tick.is_positive() {
            return Err(MmError::InvalidArgument(format!(
                "skew tick must be positive, got {tick}"
            )));
        }
        Ok(Self {
            neutral: neutral.inner(),
            band: band.inner(),
            tick: tick.inner(),
        })
    }

    /// Signed band index: 0 in the neutral zone, 1..=4 long, -1..=-4 short.
    pub fn band(&self, position: i64) -> MmResult<i64> {
        let p = Decimal::from(position);
        let n = self.neutral;
        let width = self.band * Decimal::TWO;

        if -n <= p && p <= n {
            return Ok(0);
        }
        if p > n {
            let k = (1..MAX_BAND)
                .find(|k| p <= n + width * Decimal::from(*k))
                .unwrap_or(MAX_BAND);
            return Ok(k);
        }
        if p < -n {
            let k = (1..MAX_BAND)
                .find(|k| p >= -n - width * Decimal::from(*k))
                .unwrap_or(MAX_BAND);
            return Ok(-k);
        }
        Err(MmError::UnmatchedInventoryBand { position })
    }

    /// Apply the skew for `position` to a raw quote pair.
    ///
    /// Absent sides stay absent. The capped side never crosses the touch
    /// given in `tob`.
    pub fn apply(
        &self,
        bid: Option<Price>,
        ask: Option<Price>,
        position: i64,
        tob: TopOfBook,
    ) -> MmResult<(Option<Price>, Option<Price>)> {
        let band = self.band(position)?;
        let shift = |k: i64| self.tick * Decimal::from(k);

        let (bid, ask) = match band {
            0 => (bid, ask),
            k if k > 0 => {
                let bid = bid.map(|b| Price::new(b.inner() - shift(k)));
                let ask = match k {
                    3 | 4 => ask.map(|a| {
                        let moved = Price::new(a.inner() - shift(k - 2));
                        tob.best_ask.map_or(moved, |best| moved.max(best))
                    }),
                    _ => ask,
                };
                (bid, ask)
            }
            k => {
                let k = -k;
                let ask = ask.map(|a| Price::new(a.inner() + shift(k)));
                let bid = match k {
                    3 | 4 => bid.map(|b| {
                        let moved = Price::new(b.inner() + shift(k - 2));
                        tob.best_bid.map_or(moved, |best| moved.min(best))
                    }),
                    _ => bid,
                };
                (bid, ask)
            }
        };
        Ok((bid, ask))
    }
}
