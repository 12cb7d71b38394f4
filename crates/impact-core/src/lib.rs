//! Core domain types for the impact market maker.
//!
//! This crate provides the records shared by every other crate:
//! - `Price`, `Size`: precision-safe decimal types and tick rounding
//! - `Side`: two-variant buy/sell tag
//! - `Book`, `BookLevel`, `TopOfBook`: order book snapshot
//! - `Trade`: public trade print
//! - `DesiredOrder`, `LiveOrder`, `Amendment`: order records
//! - `Instrument`, `Ticker`, `Margin`, `PositionInfo`: exchange snapshots

pub mod book;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod trade;

pub use book::{Book, BookLevel, TopOfBook};
pub use decimal::{to_nearest, Price, Size};
pub use error::{CoreError, Result};
pub use market::{Instrument, Margin, PositionInfo, Ticker};
pub use order::{Amendment, DesiredOrder, DesiredOrders, LiveOrder, OrderId, Side};
pub use trade::Trade;
