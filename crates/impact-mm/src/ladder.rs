//! Static geometric quote ladder.
//!
//! Used when there is not enough trade flow for the impact optimizer. Starts
//! one tick inside the ticker on each side and spaces `order_pairs` orders
//! outward by a fixed relative interval.
//!
//! Indices are signed: `-1, -2, ...` are buys, `1, 2, ...` are sells, and
//! `|index| == 1` is the level nearest the market.

use impact_core::{to_nearest, DesiredOrder, DesiredOrders, Price, Side, Size, Ticker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::MakerConfig;
use crate::error::{MmError, MmResult};
use crate::limits::LimitFlags;

/// Start prices the ladder branches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPrices {
    pub buy: Price,
    pub sell: Price,
    pub mid: Price,
}

/// Geometric ladder builder.
#[derive(Debug)]
pub struct StaticLadder {
    order_pairs: u32,
    start_size: Size,
    step_size: Size,
    random_order_size: bool,
    min_order_size: Size,
    max_order_size: Size,
    interval: Decimal,
    min_spread: Decimal,
    maintain_spreads: bool,
    rng: StdRng,
}

impl StaticLadder {
    pub fn from_config(config: &MakerConfig) -> Self {
        Self {
            order_pairs: config.order_pairs,
            start_size: config.order_start_size,
            step_size: config.order_step_size,
            random_order_size: config.random_order_size,
            min_order_size: config.min_order_size,
            max_order_size: config.max_order_size,
            interval: config.interval,
            min_spread: config.min_spread,
            maintain_spreads: config.maintain_spreads,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fix the RNG used for random order sizes.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Start one tick inside the ticker, keep the touch if it is already
    /// ours, and widen both sides if the result is tighter than `min_spread`.
    pub fn start_prices(
        &self,
        ticker: &Ticker,
        tick: Price,
        own_highest_buy: Option<Price>,
        own_lowest_sell: Option<Price>,
    ) -> StartPrices {
        let mut buy = ticker.buy + tick;
        let mut sell = ticker.sell - tick;

        if self.maintain_spreads {
            if own_highest_buy == Some(ticker.buy) {
                buy = ticker.buy;
            }
            if own_lowest_sell == Some(ticker.sell) {
                sell = ticker.sell;
            }
        }

        if buy * (Decimal::ONE + self.min_spread) > sell {
            let half = self.min_spread / Decimal::TWO;
            buy = buy * (Decimal::ONE - half);
            sell = sell * (Decimal::ONE + half);
        }

        StartPrices {
            buy,
            sell,
            mid: ticker.mid,
        }
    }

    /// Price of the ladder level at `index`.
    ///
    /// Fails when the geometric spacing overflows `Decimal`.
    pub fn price_offset(&self, start: &StartPrices, index: i32, tick: Price) -> MmResult<Price> {
        let (base, exponent) = if self.maintain_spreads {
            // Level 1 sits exactly on the start price.
            if index < 0 {
                (start.buy, index + 1)
            } else {
                (start.sell, index - 1)
            }
        } else {
            let mut base = if index < 0 { start.buy } else { start.sell };
            // A sell start below the buy start moves over to the sell side.
            if index > 0 && base < start.buy {
                base = start.sell;
            }
            if index < 0 && base > start.sell {
                base = start.buy;
            }
            (base, index)
        };

        let raw = compound(base.inner(), Decimal::ONE + self.interval, exponent)?;
        Ok(Price::new(to_nearest(raw, tick.inner())))
    }

    /// Quantity for the level at `index`.
    pub fn order_qty(&mut self, index: i32) -> Size {
        if self.random_order_size {
            if let (Some(lo), Some(hi)) = (
                self.min_order_size.inner().to_i64(),
                self.max_order_size.inner().to_i64(),
            ) {
                if lo <= hi {
                    return Size::from(self.rng.gen_range(lo..=hi));
                }
            }
        }
        let steps = Decimal::from(index.unsigned_abs().saturating_sub(1));
        self.start_size + self.step_size * steps
    }

    pub fn prepare_order(
        &mut self,
        start: &StartPrices,
        index: i32,
        tick: Price,
    ) -> MmResult<DesiredOrder> {
        let side = if index < 0 { Side::Buy } else { Side::Sell };
        let price = self.price_offset(start, index, tick)?;
        let qty = self.order_qty(index);
        Ok(DesiredOrder::new(side, price, qty))
    }

    /// Full ladder, outermost level first on each side. A side whose
    /// position limit is hit is left empty.
    pub fn build(
        &mut self,
        start: &StartPrices,
        tick: Price,
        limits: LimitFlags,
    ) -> MmResult<DesiredOrders> {
        let pairs = i32::try_from(self.order_pairs).map_err(|_| {
            MmError::InvalidArgument(format!("order_pairs {} out of range", self.order_pairs))
        })?;
        let mut orders = DesiredOrders::default();
        for i in (1..=pairs).rev() {
            if !limits.long_exceeded {
                orders.buys.push(self.prepare_order(start, -i, tick)?);
            }
            if !limits.short_exceeded {
                orders.sells.push(self.prepare_order(start, i, tick)?);
            }
        }
        Ok(orders)
    }

    /// Log the ticker and start prices.
    pub fn log_start(&self, symbol: &str, ticker: &Ticker, start: &StartPrices, tick_log: u32) {
        let dp = tick_log as usize;
        info!(
            "{} Ticker: Buy: {:.*}, Sell: {:.*}",
            symbol,
            dp,
            ticker.buy.inner(),
            dp,
            ticker.sell.inner()
        );
        info!(
            "Start Positions: Buy: {:.*}, Sell: {:.*}, Mid: {:.*}",
            dp,
            start.buy.inner(),
            dp,
            start.sell.inner(),
            dp,
            start.mid.inner()
        );
    }
}

/// `base * rate^exponent` for a signed integer exponent.
pub(crate) fn compound(base: Decimal, rate: Decimal, exponent: i32) -> MmResult<Decimal> {
    let overflow = || {
        MmError::InvalidArgument(format!("ladder spacing {rate}^{exponent} overflows"))
    };
    let mut factor = Decimal::ONE;
    if rate != Decimal::ONE {
        for _ in 0..exponent.unsigned_abs() {
            factor = factor.checked_mul(rate).ok_or_else(overflow)?;
        }
    }
    let value = if exponent < 0 {
        base.checked_div(factor)
    } else {
        base.checked_mul(factor)
    };
    value.ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(v: Decimal) -> Price {
        Price::new(v)
    }

    fn ladder(maintain_spreads: bool) -> StaticLadder {
        let config = MakerConfig {
            order_pairs: 3,
            interval: dec!(0.01),
            min_spread: dec!(0.001),
            maintain_spreads,
            ..Default::default()
        };
        StaticLadder::from_config(&config).with_seed(7)
    }

    fn ticker() -> Ticker {
        Ticker::new(p(dec!(100.0)), p(dec!(102.0)))
    }

    #[test]
    fn test_start_prices_one_tick_inside() {
        let l = ladder(true);
        let start = l.start_prices(&ticker(), p(dec!(0.5)), None, None);
        assert_eq!(start.buy, p(dec!(100.5)));
        assert_eq!(start.sell, p(dec!(101.5)));
        assert_eq!(start.mid, p(dec!(101.0)));
    }

    #[test]
    fn test_start_prices_keep_own_touch() {
        let l = ladder(true);
        let start = l.start_prices(&ticker(), p(dec!(0.5)), Some(p(dec!(100.0))), Some(p(dec!(102.0))));
        assert_eq!(start.buy, p(dec!(100.0)));
        assert_eq!(start.sell, p(dec!(102.0)));

        // Offset mode ignores our own orders.
        let l = ladder(false);
        let start = l.start_prices(&ticker(), p(dec!(0.5)), Some(p(dec!(100.0))), Some(p(dec!(102.0))));
        assert_eq!(start.buy, p(dec!(100.5)));
    }

    #[test]
    fn test_start_prices_back_off_when_too_tight() {
        let config = MakerConfig {
            min_spread: dec!(0.02),
            ..Default::default()
        };
        let l = StaticLadder::from_config(&config);
        let start = l.start_prices(&ticker(), p(dec!(0.5)), None, None);
        // 100.5 * 1.02 > 101.5, so widen by 1% each way.
        assert_eq!(start.buy, p(dec!(99.495)));
        assert_eq!(start.sell, p(dec!(102.515)));
    }

    #[test]
    fn test_price_offset_maintain_spreads() {
        let l = ladder(true);
        let start = l.start_prices(&ticker(), p(dec!(0.5)), None, None);
        let tick = p(dec!(0.5));
        assert_eq!(l.price_offset(&start, -1, tick).unwrap(), p(dec!(100.5)));
        assert_eq!(l.price_offset(&start, 1, tick).unwrap(), p(dec!(101.5)));
        // 101.5 * 1.01 = 102.515 -> 102.5
        assert_eq!(l.price_offset(&start, 2, tick).unwrap(), p(dec!(102.5)));
        // 100.5 / 1.01 = 99.50495... -> 99.5
        assert_eq!(l.price_offset(&start, -2, tick).unwrap(), p(dec!(99.5)));
    }

    #[test]
    fn test_price_offset_offset_mode() {
        let l = ladder(false);
        let start = StartPrices {
            buy: p(dec!(100)),
            sell: p(dec!(101)),
            mid: p(dec!(100.5)),
        };
        let tick = p(dec!(0.01));
        assert_eq!(l.price_offset(&start, 1, tick).unwrap(), p(dec!(102.01)));
        assert_eq!(l.price_offset(&start, -1, tick).unwrap(), p(dec!(99.01)));
    }

    #[test]
    fn test_order_qty_steps() {
        let mut l = ladder(true);
        assert_eq!(l.order_qty(1), Size::from(100));
        assert_eq!(l.order_qty(-1), Size::from(100));
        assert_eq!(l.order_qty(3), Size::from(300));
    }

    #[test]
    fn test_random_order_qty_within_bounds() {
        let config = MakerConfig {
            random_order_size: true,
            min_order_size: Size::from(50),
            max_order_size: Size::from(60),
            ..Default::default()
        };
        let mut l = StaticLadder::from_config(&config).with_seed(42);
        for i in 1..50 {
            let q = l.order_qty(i);
            assert!(q >= Size::from(50) && q <= Size::from(60));
        }
    }

    #[test]
    fn test_build_outermost_first_and_limits() {
        let mut l = ladder(true);
        let tick = p(dec!(0.5));
        let start = l.start_prices(&ticker(), tick, None, None);

        let orders = l.build(&start, tick, LimitFlags::default()).unwrap();
        assert_eq!(orders.buys.len(), 3);
        assert_eq!(orders.sells.len(), 3);
        // Nearest to market is last.
        assert_eq!(orders.buys.last().unwrap().price, p(dec!(100.5)));
        assert_eq!(orders.sells.last().unwrap().price, p(dec!(101.5)));
        assert_eq!(orders.buys[0].qty, Size::from(300));
        assert!(orders.buys.iter().all(|o| o.side == Side::Buy));

        let long_hit = LimitFlags {
            long_exceeded: true,
            short_exceeded: false,
        };
        let orders = l.build(&start, tick, long_hit).unwrap();
        assert!(orders.buys.is_empty());
        assert_eq!(orders.sells.len(), 3);
    }

    #[test]
    fn test_compound() {
        assert_eq!(compound(dec!(100), dec!(1.1), 0).unwrap(), dec!(100));
        assert_eq!(compound(dec!(100), dec!(1.1), 2).unwrap(), dec!(121));
        assert_eq!(compound(dec!(121), dec!(1.1), -2).unwrap(), dec!(100));
        assert_eq!(compound(dec!(100), Decimal::ONE, i32::MAX).unwrap(), dec!(100));
    }

    #[test]
    fn test_compound_overflow_is_an_error() {
        // 2^100 does not fit in a Decimal.
        assert!(matches!(
            compound(dec!(100), dec!(2), 100),
            Err(MmError::InvalidArgument(_))
        ));
        assert!(compound(dec!(100), dec!(2), -100).is_err());
    }

    #[test]
    fn test_build_overflow_is_an_error() {
        // validate() rejects this, so build from the raw ladder.
        let config = MakerConfig {
            order_pairs: 100,
            interval: dec!(1.0),
            ..Default::default()
        };
        let mut l = StaticLadder::from_config(&config);
        let start = l.start_prices(&ticker(), p(dec!(0.5)), None, None);
        let err = l.build(&start, p(dec!(0.5)), LimitFlags::default()).unwrap_err();
        assert!(matches!(err, MmError::InvalidArgument(_)));
    }
}
