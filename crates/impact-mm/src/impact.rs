//! Market impact model.
//!
//! Answers two questions about the current book:
//! - how far from mid would a marketable order of a given size push the price
//!   (`impact`)
//! - how large must a marketable order be to reach a given distance from mid
//!   (`inverse_impact`)
//!
//! An aggressor of side `Buy` consumes the ask side, `Sell` consumes the bids.
//! Both functions use the book as a static snapshot: beyond the last visible
//! level the impact is clamped to that level, never extrapolated.

use std::fmt;

use impact_core::{Book, BookLevel, Price, Side, Size, TopOfBook};
use rust_decimal::Decimal;

use crate::error::{MmError, MmResult};

/// Quantity needed to reach a target impact.
///
/// `Infinite` means the visible book cannot be moved that far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CriticalSize {
    Finite(Size),
    Infinite,
}

impl CriticalSize {
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    pub fn finite(&self) -> Option<Size> {
        match self {
            Self::Finite(size) => Some(*size),
            Self::Infinite => None,
        }
    }
}

impl fmt::Display for CriticalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(size) => write!(f, "{size}"),
            Self::Infinite => write!(f, "inf"),
        }
    }
}

/// Best bid and best ask.
pub fn top_of_book(book: &Book) -> TopOfBook {
    book.top_of_book()
}

/// Mid price; one-sided books return the present side.
pub fn mid(book: &Book) -> Option<Price> {
    let tob = book.top_of_book();
    match (tob.best_bid, tob.best_ask) {
        (Some(bid), Some(ask)) => Some(Price::new((bid.inner() + ask.inner()) / Decimal::TWO)),
        (Some(bid), None) => Some(bid),
        (None, Some(ask)) => Some(ask),
        (None, None) => None,
    }
}

/// Half the top-of-book spread. Zero for a one-sided book.
pub fn half_spread(book: &Book) -> Option<Decimal> {
    let tob = book.top_of_book();
    match (tob.best_bid, tob.best_ask) {
        (Some(bid), Some(ask)) => Some((ask.inner() - bid.inner()) / Decimal::TWO),
        (None, None) => None,
        _ => Some(Decimal::ZERO),
    }
}

/// Running total of level sizes, nearest to mid first.
pub fn cumulative_qty(levels: &[BookLevel]) -> Vec<Size> {
    levels
        .iter()
        .scan(Size::ZERO, |acc, level| {
            *acc = *acc + level.size;
            Some(*acc)
        })
        .collect()
}

/// Distance from mid reached by an `aggressor` order of `qty`.
///
/// Returns `None` when the side it would consume is empty.
pub fn impact(book: &Book, aggressor: Side, qty: Size) -> MmResult<Option<Decimal>> {
    if qty.is_negative() {
        return Err(MmError::InvalidArgument(format!(
            "impact quantity must not be negative, got {qty}"
        )));
    }

    let levels = book.side(aggressor.opposite());
    let Some(last) = levels.last() else {
        return Ok(None);
    };
    let Some(mid) = mid(book) else {
        return Ok(None);
    };

    if qty.is_zero() {
        return Ok(Some(Decimal::ZERO));
    }

    // Bucket i covers (cum[i-1], cum[i]]; past the last level we clamp.
    let cumulative = cumulative_qty(levels);
    let level = cumulative
        .iter()
        .position(|cum| qty <= *cum)
        .map_or(last, |i| &levels[i]);

    Ok(Some(level.price.distance(mid)))
}

/// Smallest `aggressor` quantity whose impact reaches `target`.
pub fn inverse_impact(book: &Book, aggressor: Side, target: Decimal) -> MmResult<CriticalSize> {
    if target < Decimal::ZERO {
        return Err(MmError::InvalidArgument(format!(
            "target impact must not be negative, got {target}"
        )));
    }

    let levels = book.side(aggressor.opposite());
    let (Some(mid), Some(half_spread)) = (mid(book), half_spread(book)) else {
        return Ok(CriticalSize::Infinite);
    };
    if levels.is_empty() {
        return Ok(CriticalSize::Infinite);
    }
    if target < half_spread {
        return Ok(CriticalSize::Finite(Size::ZERO));
    }

    let impacts: Vec<Decimal> = levels.iter().map(|l| l.price.distance(mid)).collect();
    let cumulative = cumulative_qty(levels);

    // Impacts are non-decreasing with distance from mid, so the last level at
    // or inside the target owns the bucket [impact_i, impact_{i+1}).
    let Some(i) = impacts.iter().rposition(|imp| *imp <= target) else {
        return Ok(CriticalSize::Finite(Size::ZERO));
    };

    if i == impacts.len() - 1 && target > impacts[i] {
        return Ok(CriticalSize::Infinite);
    }

    Ok(CriticalSize::Finite(cumulative[i]))
}

/// Impacts sampled at `[1, step, 2*step, ...]` up to and including `max_qty`.
///
/// Sizes whose impact is undefined are skipped.
pub fn impact_curve(
    book: &Book,
    aggressor: Side,
    max_qty: Size,
    step: Size,
) -> MmResult<Vec<(Size, Decimal)>> {
    if !step.is_positive() {
        return Err(MmError::InvalidArgument(format!(
            "impact curve step must be positive, got {step}"
        )));
    }

    let mut sizes = vec![Size::ONE];
    let mut q = step;
    while q <= max_qty {
        sizes.push(q);
        q = q + step;
    }

    let mut curve = Vec::with_capacity(sizes.len());
    for size in sizes {
        if let Some(imp) = impact(book, aggressor, size)? {
            curve.push((size, imp));
        }
    }
    Ok(curve)
}

/// Largest impact on a sampled curve.
pub fn max_impact(curve: &[(Size, Decimal)]) -> Option<Decimal> {
    curve.iter().map(|(_, imp)| *imp).max()
}
