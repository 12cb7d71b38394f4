//! Dry-run wrapper.
//!
//! Reads go to the wrapped exchange; mutations are logged and dropped. Open
//! orders always read as empty, so every tick plans a full create.

use impact_core::{
    Amendment, Book, DesiredOrder, Instrument, LiveOrder, Margin, OrderId, PositionInfo, Size,
    Ticker, Trade,
};
use tracing::info;

use crate::error::ExchangeResult;
use crate::exchange::Exchange;

#[derive(Debug)]
pub struct DryRunExchange<E> {
    inner: E,
}

impl<E: Exchange> DryRunExchange<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Exchange> Exchange for DryRunExchange<E> {
    fn instrument(&self) -> ExchangeResult<Instrument> {
        self.inner.instrument()
    }

    fn margin(&self) -> ExchangeResult<Margin> {
        self.inner.margin()
    }

    fn position(&self) -> ExchangeResult<PositionInfo> {
        self.inner.position()
    }

    fn delta(&self) -> ExchangeResult<i64> {
        self.inner.delta()
    }

    fn ticker(&self) -> ExchangeResult<Ticker> {
        self.inner.ticker()
    }

    fn open_orders(&self) -> ExchangeResult<Vec<LiveOrder>> {
        Ok(Vec::new())
    }

    fn market_depth(&self) -> ExchangeResult<Book> {
        self.inner.market_depth()
    }

    fn recent_trades(&self) -> ExchangeResult<Vec<Trade>> {
        self.inner.recent_trades()
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        info!(dry_run = true, "Would cancel all orders");
        Ok(())
    }

    fn amend_bulk(&self, amendments: &[Amendment]) -> ExchangeResult<()> {
        info!(dry_run = true, count = amendments.len(), "Would amend orders");
        Ok(())
    }

    fn create_bulk(&self, orders: &[DesiredOrder]) -> ExchangeResult<Vec<LiveOrder>> {
        info!(dry_run = true, count = orders.len(), "Would create orders");
        Ok(orders
            .iter()
            .map(|o| LiveOrder {
                order_id: OrderId::generate(),
                side: o.side,
                price: o.price,
                leaves_qty: o.qty,
                cum_qty: Size::ZERO,
            })
            .collect())
    }

    fn cancel_bulk(&self, orders: &[LiveOrder]) -> ExchangeResult<()> {
        info!(dry_run = true, count = orders.len(), "Would cancel orders");
        Ok(())
    }

    fn check_orderbook_not_empty(&self) -> ExchangeResult<()> {
        self.inner.check_orderbook_not_empty()
    }

    fn check_market_open(&self) -> ExchangeResult<()> {
        self.inner.check_market_open()
    }

    fn is_connection_open(&self) -> bool {
        self.inner.is_connection_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{PaperConfig, PaperExchange};
    use impact_core::{Price, Side};
    use rust_decimal_macros::dec;

    #[test]
    fn test_mutations_never_reach_venue() {
        let dry = DryRunExchange::new(PaperExchange::from_config(&PaperConfig::default()).unwrap());
        let order = DesiredOrder::new(Side::Buy, Price::new(dec!(99)), Size::from(100));

        let created = dry.create_bulk(&[order]).unwrap();
        assert_eq!(created.len(), 1);
        dry.cancel_bulk(&created).unwrap();
        dry.cancel_all_orders().unwrap();

        assert!(dry.inner().calls().is_empty());
        assert!(dry.open_orders().unwrap().is_empty());
    }

    #[test]
    fn test_reads_delegate() {
        let paper = PaperExchange::from_config(&PaperConfig::default()).unwrap();
        paper.set_position(250);
        let dry = DryRunExchange::new(paper);
        assert_eq!(dry.delta().unwrap(), 250);
        assert_eq!(dry.ticker().unwrap().buy, Price::new(dec!(100.0)));
    }
}
