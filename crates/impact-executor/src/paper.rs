//! In-memory paper venue.
//!
//! Holds a static order book, our resting orders and a position, and serves
//! them through the `Exchange` trait. Used by the binary when no live venue
//! is configured and by tests, which can script failures (stale amends,
//! dropped connections, closed markets) and fills.

use chrono::{DateTime, Duration, Utc};
use impact_core::{
    Amendment, Book, DesiredOrder, Instrument, LiveOrder, Margin, OrderId, PositionInfo, Price,
    Side, Size, Ticker, Trade,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::Exchange;

/// Trades kept on the paper tape.
const TAPE_CAPACITY: usize = 1000;

// ============================================================================
// Configuration
// ============================================================================

/// One seeded book level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperLevel {
    pub price: Price,
    pub size: Size,
}

/// Seed state for the paper venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub symbol: String,
    pub tick_size: Price,
    /// Bids, any order.
    pub bids: Vec<PaperLevel>,
    /// Asks, any order.
    pub asks: Vec<PaperLevel>,
    pub wallet_balance: Decimal,
    /// Starting signed position.
    pub position: i64,
    /// Random prints added to the tape on every `recent_trades` call.
    /// Zero keeps the tape empty.
    pub synthetic_trades: usize,
    /// Upper bound for synthetic print sizes.
    pub synthetic_max_size: i64,
    /// RNG seed for synthetic prints.
    pub seed: Option<u64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        let level = |price, size| PaperLevel {
            price: Price::new(price),
            size: Size::from(size),
        };
        Self {
            symbol: "XBTUSD".to_string(),
            tick_size: Price::new(dec!(0.5)),
            bids: vec![
                level(dec!(100.0), 400),
                level(dec!(99.5), 200),
                level(dec!(99.0), 600),
                level(dec!(98.5), 300),
            ],
            asks: vec![
                level(dec!(100.5), 40),
                level(dec!(101.0), 50),
                level(dec!(101.5), 500),
                level(dec!(102.0), 250),
            ],
            wallet_balance: dec!(1.0),
            position: 0,
            synthetic_trades: 4,
            synthetic_max_size: 100,
            seed: None,
        }
    }
}

// ============================================================================
// Call log
// ============================================================================

/// Mutation received by the paper venue, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperCall {
    CancelAll,
    Amend(Vec<Amendment>),
    Create(Vec<DesiredOrder>),
    Cancel(Vec<OrderId>),
}

// ============================================================================
// Venue
// ============================================================================

#[derive(Debug)]
struct PaperState {
    instrument: Instrument,
    book: Book,
    margin: Margin,
    position: PositionInfo,
    /// Resting orders in placement order.
    orders: Vec<LiveOrder>,
    tape: Vec<Trade>,
    calls: Vec<PaperCall>,
    market_open: bool,
    connected: bool,
    authenticated: bool,
    fail_next_amend: Option<ExchangeError>,
    synthetic_trades: usize,
    synthetic_max_size: i64,
    rng: StdRng,
    clock: DateTime<Utc>,
    trade_seq: u64,
}

impl PaperState {
    fn append_synthetic_trades(&mut self) {
        for _ in 0..self.synthetic_trades {
            let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let size = self.rng.gen_range(1..=self.synthetic_max_size.max(1));
            self.clock += Duration::milliseconds(self.rng.gen_range(50..2_000));
            self.trade_seq += 1;
            let trade = Trade::new(side, Size::from(size), self.clock, format!("paper-{}", self.trade_seq));
            self.tape.push(trade);
        }
        if self.tape.len() > TAPE_CAPACITY {
            let excess = self.tape.len() - TAPE_CAPACITY;
            self.tape.drain(..excess);
        }
    }
}

/// In-memory exchange.
#[derive(Debug)]
pub struct PaperExchange {
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(instrument: Instrument, book: Book) -> Self {
        Self {
            state: Mutex::new(PaperState {
                instrument,
                book,
                margin: Margin::default(),
                position: PositionInfo::flat(),
                orders: Vec::new(),
                tape: Vec::new(),
                calls: Vec::new(),
                market_open: true,
                connected: true,
                authenticated: true,
                fail_next_amend: None,
                synthetic_trades: 0,
                synthetic_max_size: 1,
                rng: StdRng::from_entropy(),
                clock: Utc::now(),
                trade_seq: 0,
            }),
        }
    }

    /// Build from a seed configuration.
    pub fn from_config(config: &PaperConfig) -> impact_core::Result<Self> {
        let instrument = Instrument::new(config.symbol.clone(), config.tick_size)?;
        let bids: Vec<_> = config.bids.iter().map(|l| (l.price, l.size)).collect();
        let asks: Vec<_> = config.asks.iter().map(|l| (l.price, l.size)).collect();
        let book = Book::from_sides(&bids, &asks)?;

        let exchange = Self::new(instrument, book);
        {
            let mut state = exchange.state.lock();
            state.margin = Margin {
                wallet_balance: config.wallet_balance,
                margin_balance: config.wallet_balance,
                available_margin: config.wallet_balance,
            };
            state.position.current_qty = config.position;
            state.synthetic_trades = config.synthetic_trades;
            state.synthetic_max_size = config.synthetic_max_size;
            if let Some(seed) = config.seed {
                state.rng = StdRng::seed_from_u64(seed);
            }
        }
        Ok(exchange)
    }

    // ---- scripting ----

    pub fn set_book(&self, book: Book) {
        self.state.lock().book = book;
    }

    pub fn set_position(&self, qty: i64) {
        self.state.lock().position.current_qty = qty;
    }

    pub fn set_market_open(&self, open: bool) {
        self.state.lock().market_open = open;
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.state.lock().authenticated = authenticated;
    }

    /// Drop the realtime connection.
    pub fn close_connection(&self) {
        self.state.lock().connected = false;
    }

    /// Make the next `amend_bulk` fail with `error` without applying it.
    pub fn fail_next_amend(&self, error: ExchangeError) {
        self.state.lock().fail_next_amend = Some(error);
    }

    /// Append prints to the tape.
    pub fn push_trades(&self, trades: impl IntoIterator<Item = Trade>) {
        self.state.lock().tape.extend(trades);
    }

    /// Fill `qty` of a resting order and move the position.
    pub fn fill_order(&self, order_id: &OrderId, qty: Size) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        let idx = state
            .orders
            .iter()
            .position(|o| &o.order_id == order_id)
            .ok_or_else(|| ExchangeError::StaleOrder(format!("order {order_id} not found")))?;

        let order = &mut state.orders[idx];
        let filled = if qty > order.leaves_qty { order.leaves_qty } else { qty };
        order.leaves_qty = order.leaves_qty - filled;
        order.cum_qty = order.cum_qty + filled;
        let side = order.side;
        if order.leaves_qty.is_zero() {
            state.orders.remove(idx);
        }

        let contracts = filled.inner().to_i64().unwrap_or(0);
        state.position.current_qty += side.sign() * contracts;
        Ok(())
    }

    // ---- inspection ----

    /// Our resting orders, in placement order.
    pub fn resting(&self) -> Vec<LiveOrder> {
        self.state.lock().orders.clone()
    }

    /// Every mutation received so far.
    pub fn calls(&self) -> Vec<PaperCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl Exchange for PaperExchange {
    fn instrument(&self) -> ExchangeResult<Instrument> {
        Ok(self.state.lock().instrument.clone())
    }

    fn margin(&self) -> ExchangeResult<Margin> {
        Ok(self.state.lock().margin)
    }

    fn position(&self) -> ExchangeResult<PositionInfo> {
        Ok(self.state.lock().position)
    }

    fn delta(&self) -> ExchangeResult<i64> {
        Ok(self.state.lock().position.current_qty)
    }

    fn ticker(&self) -> ExchangeResult<Ticker> {
        let state = self.state.lock();
        let top = state.book.top_of_book();
        match (top.best_bid, top.best_ask) {
            (Some(bid), Some(ask)) => Ok(Ticker::new(bid, ask)),
            _ => Err(ExchangeError::OrderbookEmpty),
        }
    }

    fn open_orders(&self) -> ExchangeResult<Vec<LiveOrder>> {
        Ok(self.state.lock().orders.clone())
    }

    fn market_depth(&self) -> ExchangeResult<Book> {
        Ok(self.state.lock().book.clone())
    }

    fn recent_trades(&self) -> ExchangeResult<Vec<Trade>> {
        let mut state = self.state.lock();
        state.append_synthetic_trades();
        Ok(state.tape.clone())
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        if !state.authenticated {
            return Err(ExchangeError::Authentication);
        }
        state.calls.push(PaperCall::CancelAll);
        state.orders.clear();
        Ok(())
    }

    fn amend_bulk(&self, amendments: &[Amendment]) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(PaperCall::Amend(amendments.to_vec()));
        if let Some(error) = state.fail_next_amend.take() {
            return Err(error);
        }

        // Validate the whole batch before touching any order.
        let mut targets = Vec::with_capacity(amendments.len());
        for amend in amendments {
            let idx = state
                .orders
                .iter()
                .position(|o| o.order_id == amend.order_id)
                .ok_or_else(|| {
                    ExchangeError::StaleOrder(format!("order {} is no longer open", amend.order_id))
                })?;
            if amend.total_qty <= state.orders[idx].cum_qty {
                return Err(ExchangeError::StaleOrder(format!(
                    "order {} already filled {}",
                    amend.order_id, state.orders[idx].cum_qty
                )));
            }
            targets.push(idx);
        }

        for (amend, idx) in amendments.iter().zip(targets) {
            let order = &mut state.orders[idx];
            order.price = amend.price;
            order.leaves_qty = amend.total_qty - order.cum_qty;
        }
        Ok(())
    }

    fn create_bulk(&self, orders: &[DesiredOrder]) -> ExchangeResult<Vec<LiveOrder>> {
        let mut state = self.state.lock();
        state.calls.push(PaperCall::Create(orders.to_vec()));
        let created: Vec<LiveOrder> = orders
            .iter()
            .map(|o| LiveOrder {
                order_id: OrderId::generate(),
                side: o.side,
                price: o.price,
                leaves_qty: o.qty,
                cum_qty: Size::ZERO,
            })
            .collect();
        state.orders.extend(created.iter().cloned());
        Ok(created)
    }

    fn cancel_bulk(&self, orders: &[LiveOrder]) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        let ids: Vec<OrderId> = orders.iter().map(|o| o.order_id.clone()).collect();
        state.calls.push(PaperCall::Cancel(ids.clone()));
        let before = state.orders.len();
        state.orders.retain(|o| !ids.contains(&o.order_id));
        let missing = ids.len() - (before - state.orders.len());
        if missing > 0 {
            debug!(missing, "Cancel targeted orders that were already closed");
        }
        Ok(())
    }

    fn check_orderbook_not_empty(&self) -> ExchangeResult<()> {
        let state = self.state.lock();
        if state.book.bid_side().is_empty() || state.book.ask_side().is_empty() {
            return Err(ExchangeError::OrderbookEmpty);
        }
        Ok(())
    }

    fn check_market_open(&self) -> ExchangeResult<()> {
        if self.state.lock().market_open {
            Ok(())
        } else {
            Err(ExchangeError::MarketClosed)
        }
    }

    fn is_connection_open(&self) -> bool {
        self.state.lock().connected
    }
}
