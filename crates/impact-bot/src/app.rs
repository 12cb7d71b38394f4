//! Order manager.
//!
//! Owns all engine state for one exchange session and drives it one tick at
//! a time:
//! - connection check (a dropped feed asks the supervisor for a restart)
//! - sanity check (book present, market open, ladder inside the ticker)
//! - status logging and trade flow ingestion
//! - strategy decision and order convergence, retried after an amend race
//!
//! Dropping the manager cancels every resting order unless it is being
//! dropped for a restart.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::shutdown::ExitHandler;
use impact_core::{Instrument, Side, Ticker};
use impact_executor::{ConvergeOutcome, ConvergeSummary, ConvergenceEngine, DynExchange, ExchangeError};
use impact_mm::{
    build_strategy, PositionLimitGuard, StartPrices, StaticLadder, Strategy, TickState,
    TradeFlowEstimator,
};
use impact_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, error, info};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Converged(ConvergeSummary),
    /// The strategy produced no output; nothing was sent.
    Skipped,
    /// The realtime connection is gone; rebuild the session.
    RestartRequested,
}

pub struct OrderManager {
    config: AppConfig,
    exchange: DynExchange,
    exit: ExitHandler,
    instrument: Instrument,
    strategy: Box<dyn Strategy>,
    ladder: StaticLadder,
    limits: PositionLimitGuard,
    flow: TradeFlowEstimator,
    engine: ConvergenceEngine,
    starting_qty: i64,
    restarting: bool,
}

impl OrderManager {
    pub fn new(config: AppConfig, exchange: DynExchange) -> AppResult<Self> {
        config.validate()?;

        if config.runtime.dry_run {
            info!("Initializing dry run. Orders printed below represent what would be posted to the exchange.");
        } else {
            info!("Order Manager initializing, connecting to exchange. Live run: executing real trades.");
        }

        let instrument = exchange.instrument()?;
        info!("Using symbol {}.", instrument.symbol);
        let starting_qty = exchange.delta()?;

        let maker = &config.maker;
        Ok(Self {
            exit: ExitHandler::new(exchange.clone()),
            strategy: build_strategy(config.runtime.strategy, maker),
            ladder: StaticLadder::from_config(maker),
            limits: PositionLimitGuard::from_config(maker),
            flow: TradeFlowEstimator::new(maker.trade_window_capacity),
            engine: ConvergenceEngine::new(maker.relist_tolerance),
            instrument,
            starting_qty,
            restarting: false,
            exchange,
            config,
        })
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Clear out orders from a previous run and verify exchange state.
    pub fn reset(&mut self) -> AppResult<()> {
        self.exchange.cancel_all_orders()?;
        self.sanity_check()?;
        self.print_status()?;
        Ok(())
    }

    /// One full tick.
    pub fn tick(&mut self) -> AppResult<TickOutcome> {
        if !self.exchange.is_connection_open() {
            error!("Realtime data connection unexpectedly closed, restarting.");
            self.restarting = true;
            Metrics::tick("restart");
            return Ok(TickOutcome::RestartRequested);
        }

        let (ticker, start) = self.sanity_check()?;
        self.print_status()?;

        let outcome = match self.place_orders(&ticker, &start) {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(e, AppError::FatalAmend(_)) {
                    Metrics::tick("fatal");
                }
                return Err(e);
            }
        };
        match outcome {
            TickOutcome::Converged(_) => Metrics::tick("converged"),
            TickOutcome::Skipped => Metrics::tick("skipped"),
            TickOutcome::RestartRequested => Metrics::tick("restart"),
        }
        Ok(outcome)
    }

    /// Cancel everything now instead of on drop.
    pub fn shutdown(&self) -> bool {
        self.exit.run()
    }

    /// Book present, market open, and the innermost ladder level strictly
    /// inside the ticker. Returns the ticker and start prices it checked.
    pub fn sanity_check(&self) -> AppResult<(Ticker, StartPrices)> {
        if let Err(e) = self.exchange.check_orderbook_not_empty() {
            return Err(self.sanity_failure("orderbook_empty", e));
        }
        if let Err(e) = self.exchange.check_market_open() {
            return Err(self.sanity_failure("market_closed", e));
        }

        let ticker = self.exchange.ticker()?;
        let live = self.exchange.open_orders()?;
        let tick = self.instrument.tick_size;
        let own_buy = live.iter().filter(|o| o.side == Side::Buy).map(|o| o.price).max();
        let own_sell = live.iter().filter(|o| o.side == Side::Sell).map(|o| o.price).min();
        let start = self.ladder.start_prices(&ticker, tick, own_buy, own_sell);
        self.ladder
            .log_start(&self.instrument.symbol, &ticker, &start, self.instrument.tick_log);

        let first_buy = self.ladder.price_offset(&start, -1, tick)?;
        let first_sell = self.ladder.price_offset(&start, 1, tick)?;
        if first_buy >= ticker.sell || first_sell <= ticker.buy {
            error!(
                start_buy = %start.buy,
                start_sell = %start.sell,
                first_buy = %first_buy,
                best_ask = %ticker.sell,
                first_sell = %first_sell,
                best_bid = %ticker.buy,
                "Sanity check failed, exchange data is inconsistent"
            );
            Metrics::sanity_failure("crossed");
            return Err(AppError::SanityCheck(format!(
                "first buy {first_buy} / first sell {first_sell} outside ticker {} / {}",
                ticker.buy, ticker.sell
            )));
        }

        let position = self.exchange.delta()?;
        self.limits.log_limits(position);
        Ok((ticker, start))
    }

    fn sanity_failure(&self, reason: &str, cause: ExchangeError) -> AppError {
        error!(reason, error = %cause, "Sanity check failed, exchange data is inconsistent");
        Metrics::sanity_failure(reason);
        AppError::SanityCheck(cause.to_string())
    }

    /// Log balance and position.
    pub fn print_status(&self) -> AppResult<()> {
        let margin = self.exchange.margin()?;
        let position = self.exchange.position()?;
        let running_qty = self.exchange.delta()?;
        let dp = self.instrument.tick_log as usize;

        info!("Current Balance: {:.6}", margin.margin_balance);
        info!("Current Contract Position: {}", running_qty);
        if self.limits.enabled() {
            info!(
                "Position limits: {}/{}",
                self.config.maker.min_position, self.config.maker.max_position
            );
        }
        if position.current_qty != 0 {
            if let Some(entry) = position.avg_entry_price {
                info!("Avg Entry Price: {:.*}", dp, entry.inner());
            }
        }
        info!("Contracts Traded This Run: {}", running_qty - self.starting_qty);
        Metrics::position(running_qty);
        Ok(())
    }

    /// Decide and converge, re-running both after an amend race.
    fn place_orders(&mut self, ticker: &Ticker, start: &StartPrices) -> AppResult<TickOutcome> {
        loop {
            let position = self.exchange.delta()?;
            let book = self.exchange.market_depth()?;
            let live = self.exchange.open_orders()?;
            self.flow.ingest(self.exchange.recent_trades()?);
            self.record_flow();

            let state = TickState {
                book: &book,
                ticker,
                start,
                instrument: &self.instrument,
                position,
                live_orders: &live,
                flow: &self.flow,
                limits: self.limits.flags(position),
            };
            let Some(desired) = self.strategy.decide(&state)? else {
                debug!(strategy = self.strategy.name(), "No desired orders this tick");
                return Ok(TickOutcome::Skipped);
            };
            if let Some(quotes) = self.strategy.last_quotes() {
                if let Some(bid) = quotes.bid.and_then(|p| p.inner().to_f64()) {
                    Metrics::optimal_price("bid", bid);
                }
                if let Some(ask) = quotes.ask.and_then(|p| p.inner().to_f64()) {
                    Metrics::optimal_price("ask", ask);
                }
            }

            match self
                .engine
                .converge(&*self.exchange, &self.instrument, &desired)?
            {
                ConvergeOutcome::Converged(summary) => {
                    Metrics::orders(summary.amended, summary.created, summary.cancelled);
                    return Ok(TickOutcome::Converged(summary));
                }
                ConvergeOutcome::RaceDetected => {
                    Metrics::race_retry();
                    std::thread::sleep(self.config.runtime.race_retry_delay());
                }
            }
        }
    }

    fn record_flow(&self) {
        let snap = self.flow.log_snapshot();
        Metrics::trade_window_len(self.flow.window().len());
        Metrics::flow_rates("buy", snap.buy_arrival_rate, snap.buy_size_rate);
        Metrics::flow_rates("sell", snap.sell_arrival_rate, snap.sell_size_rate);
    }
}

impl Drop for OrderManager {
    fn drop(&mut self) {
        if !self.restarting {
            self.exit.run();
        }
    }
}

impl std::fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManager")
            .field("instrument", &self.instrument)
            .field("strategy", &self.strategy.name())
            .field("starting_qty", &self.starting_qty)
            .field("restarting", &self.restarting)
            .finish()
    }
}
