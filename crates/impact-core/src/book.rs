//! Order book snapshot.
//!
//! A `Book` is built from an unordered set of levels and keeps each side
//! sorted by distance from mid: asks ascending by price, bids descending.

use crate::{CoreError, Price, Result, Side, Size};
use serde::{Deserialize, Serialize};

/// A single price level. `Side::Buy` is a bid, `Side::Sell` an ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub side: Side,
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(side: Side, price: Price, size: Size) -> Self {
        Self { side, price, size }
    }

    pub fn bid(price: Price, size: Size) -> Self {
        Self::new(Side::Buy, price, size)
    }

    pub fn ask(price: Price, size: Size) -> Self {
        Self::new(Side::Sell, price, size)
    }
}

/// Best bid and best ask, each absent when that side is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopOfBook {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

/// Order book snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
}

impl Book {
    /// Build a book from levels in any order.
    ///
    /// Fails with `CoreError::DuplicateLevel` if two levels on the same side
    /// share a price, and with `CoreError::InvalidSize` on a negative size.
    pub fn new(levels: impl IntoIterator<Item = BookLevel>) -> Result<Self> {
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for level in levels {
            if level.size.is_negative() {
                return Err(CoreError::InvalidSize(format!(
                    "negative size {} at {} {}",
                    level.size, level.side, level.price
                )));
            }
            match level.side {
                Side::Buy => bids.push(level),
                Side::Sell => asks.push(level),
            }
        }

        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        for side in [&bids, &asks] {
            if let Some(dup) = side.windows(2).find(|w| w[0].price == w[1].price) {
                return Err(CoreError::DuplicateLevel {
                    side: dup[0].side,
                    price: dup[0].price,
                });
            }
        }

        Ok(Self { bids, asks })
    }

    /// Convenience constructor from `(price, size)` pairs per side.
    pub fn from_sides(bids: &[(Price, Size)], asks: &[(Price, Size)]) -> Result<Self> {
        let levels = bids
            .iter()
            .map(|&(p, s)| BookLevel::bid(p, s))
            .chain(asks.iter().map(|&(p, s)| BookLevel::ask(p, s)));
        Self::new(levels)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Bids, best (highest) first.
    pub fn bid_side(&self) -> &[BookLevel] {
        &self.bids
    }

    /// Asks, best (lowest) first.
    pub fn ask_side(&self) -> &[BookLevel] {
        &self.asks
    }

    /// Resting levels on `side`, nearest to mid first.
    pub fn side(&self, side: Side) -> &[BookLevel] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.bids.first().map(|l| l.price),
            best_ask: self.asks.first().map(|l| l.price),
        }
    }

    /// True when both sides exist and the best bid is at or above the best ask.
    pub fn is_crossed(&self) -> bool {
        match (self.bids.first(), self.asks.first()) {
            (Some(b), Some(a)) => b.price >= a.price,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(v: rust_decimal::Decimal) -> Price {
        Price::new(v)
    }

    fn s(v: rust_decimal::Decimal) -> Size {
        Size::new(v)
    }

    #[test]
    fn test_sides_sorted_by_distance_from_mid() {
        let book = Book::new([
            BookLevel::ask(p(dec!(101)), s(dec!(25))),
            BookLevel::ask(p(dec!(98)), s(dec!(100))),
            BookLevel::bid(p(dec!(95)), s(dec!(10))),
            BookLevel::ask(p(dec!(100)), s(dec!(60))),
            BookLevel::bid(p(dec!(97)), s(dec!(5))),
            BookLevel::ask(p(dec!(99)), s(dec!(150))),
        ])
        .unwrap();

        let asks: Vec<_> = book.ask_side().iter().map(|l| l.price).collect();
        assert_eq!(asks, vec![p(dec!(98)), p(dec!(99)), p(dec!(100)), p(dec!(101))]);

        let bids: Vec<_> = book.bid_side().iter().map(|l| l.price).collect();
        assert_eq!(bids, vec![p(dec!(97)), p(dec!(95))]);
    }

    #[test]
    fn test_duplicate_level_rejected() {
        let err = Book::new([
            BookLevel::bid(p(dec!(100)), s(dec!(1))),
            BookLevel::bid(p(dec!(100)), s(dec!(2))),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateLevel { side: Side::Buy, .. }));
    }

    #[test]
    fn test_same_price_on_both_sides_allowed() {
        // Crossed, but not a duplicate within a side.
        let book = Book::from_sides(
            &[(p(dec!(100)), s(dec!(1)))],
            &[(p(dec!(100)), s(dec!(1)))],
        )
        .unwrap();
        assert!(book.is_crossed());
    }

    #[test]
    fn test_negative_size_rejected() {
        let err = Book::from_sides(&[(p(dec!(100)), s(dec!(-1)))], &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSize(_)));
    }

    #[test]
    fn test_top_of_book() {
        assert_eq!(Book::empty().top_of_book(), TopOfBook::default());

        let book = Book::from_sides(&[(p(dec!(99.5)), s(dec!(3)))], &[]).unwrap();
        let tob = book.top_of_book();
        assert_eq!(tob.best_bid, Some(p(dec!(99.5))));
        assert_eq!(tob.best_ask, None);
    }
}
