//! Exchange collaborator trait.
//!
//! Abstracts the venue session so the order manager can run against a live
//! client, the in-memory paper venue, or a dry-run wrapper. All calls are
//! synchronous; the tick loop is single-threaded.

use std::sync::Arc;

use impact_core::{
    Amendment, Book, DesiredOrder, Instrument, LiveOrder, Margin, PositionInfo, Ticker, Trade,
};

use crate::error::ExchangeResult;

/// Exchange session used by the order manager.
pub trait Exchange: Send + Sync {
    fn instrument(&self) -> ExchangeResult<Instrument>;

    fn margin(&self) -> ExchangeResult<Margin>;

    fn position(&self) -> ExchangeResult<PositionInfo>;

    /// Signed net contracts.
    fn delta(&self) -> ExchangeResult<i64>;

    fn ticker(&self) -> ExchangeResult<Ticker>;

    /// Our resting orders, in exchange order.
    fn open_orders(&self) -> ExchangeResult<Vec<LiveOrder>>;

    fn market_depth(&self) -> ExchangeResult<Book>;

    fn recent_trades(&self) -> ExchangeResult<Vec<Trade>>;

    fn cancel_all_orders(&self) -> ExchangeResult<()>;

    /// Amend in one request. Fails with `ExchangeError::StaleOrder` if any
    /// target is no longer amendable.
    fn amend_bulk(&self, amendments: &[Amendment]) -> ExchangeResult<()>;

    fn create_bulk(&self, orders: &[DesiredOrder]) -> ExchangeResult<Vec<LiveOrder>>;

    fn cancel_bulk(&self, orders: &[LiveOrder]) -> ExchangeResult<()>;

    fn check_orderbook_not_empty(&self) -> ExchangeResult<()>;

    fn check_market_open(&self) -> ExchangeResult<()>;

    /// Whether the realtime data connection is still up.
    fn is_connection_open(&self) -> bool;
}

/// Shared exchange trait object.
pub type DynExchange = Arc<dyn Exchange>;

impl<E: Exchange + ?Sized> Exchange for Arc<E> {
    fn instrument(&self) -> ExchangeResult<Instrument> {
        (**self).instrument()
    }

    fn margin(&self) -> ExchangeResult<Margin> {
        (**self).margin()
    }

    fn position(&self) -> ExchangeResult<PositionInfo> {
        (**self).position()
    }

    fn delta(&self) -> ExchangeResult<i64> {
        (**self).delta()
    }

    fn ticker(&self) -> ExchangeResult<Ticker> {
        (**self).ticker()
    }

    fn open_orders(&self) -> ExchangeResult<Vec<LiveOrder>> {
        (**self).open_orders()
    }

    fn market_depth(&self) -> ExchangeResult<Book> {
        (**self).market_depth()
    }

    fn recent_trades(&self) -> ExchangeResult<Vec<Trade>> {
        (**self).recent_trades()
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        (**self).cancel_all_orders()
    }

    fn amend_bulk(&self, amendments: &[Amendment]) -> ExchangeResult<()> {
        (**self).amend_bulk(amendments)
    }

    fn create_bulk(&self, orders: &[DesiredOrder]) -> ExchangeResult<Vec<LiveOrder>> {
        (**self).create_bulk(orders)
    }

    fn cancel_bulk(&self, orders: &[LiveOrder]) -> ExchangeResult<()> {
        (**self).cancel_bulk(orders)
    }

    fn check_orderbook_not_empty(&self) -> ExchangeResult<()> {
        (**self).check_orderbook_not_empty()
    }

    fn check_market_open(&self) -> ExchangeResult<()> {
        (**self).check_market_open()
    }

    fn is_connection_open(&self) -> bool {
        (**self).is_connection_open()
    }
}
