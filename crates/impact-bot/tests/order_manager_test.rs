//! Order manager integration tests.
//!
//! Each test runs real ticks against the paper venue and checks what reached
//! it:
//! - startup reset and ladder placement
//! - steady state and partial refresh after a fill
//! - impact quotes once the tape has enough prints
//! - amend race retry, fatal amend, sanity failures

mod integration;
use integration::common::fixtures::{balanced_trades, book, config, manager, p, paper};

use impact_bot::{AppError, OrderManager, TickOutcome};
use impact_core::{DesiredOrder, Side, Size};
use impact_executor::{
    ConvergeSummary, DryRunExchange, Exchange, ExchangeError, PaperCall,
};
use impact_mm::StrategyKind;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn prices(orders: &[impact_core::LiveOrder], side: Side) -> Vec<impact_core::Price> {
    orders.iter().filter(|o| o.side == side).map(|o| o.price).collect()
}

#[test]
fn test_reset_cancels_leftover_orders() {
    let ex = paper();
    ex.create_bulk(&[DesiredOrder::new(Side::Buy, p(dec!(90)), Size::from(10))])
        .unwrap();
    ex.clear_calls();

    let mut m = manager(config(), &ex);
    m.reset().unwrap();
    assert_eq!(ex.calls(), vec![PaperCall::CancelAll]);
    assert!(ex.resting().is_empty());
}

#[test]
fn test_first_tick_places_ladder_then_holds_steady() {
    let ex = paper();
    let mut m = manager(config(), &ex);

    let outcome = m.tick().unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Converged(ConvergeSummary {
            amended: 0,
            created: 4,
            cancelled: 0,
        })
    );
    let resting = ex.resting();
    assert_eq!(prices(&resting, Side::Buy), vec![p(dec!(99.5)), p(dec!(100.0))]);
    assert_eq!(prices(&resting, Side::Sell), vec![p(dec!(101.0)), p(dec!(100.5))]);
    assert_eq!(resting[0].leaves_qty, Size::from(200));
    assert_eq!(resting[1].leaves_qty, Size::from(100));

    // Start prices shift by one tick now that the touch is ours, which stays
    // inside the relist tolerance.
    ex.clear_calls();
    let outcome = m.tick().unwrap();
    assert_eq!(outcome, TickOutcome::Converged(ConvergeSummary::default()));
    assert!(ex.calls().is_empty());
}

#[test]
fn test_inner_fill_recreates_inner_level_only() {
    let ex = paper();
    let mut m = manager(config(), &ex);
    m.tick().unwrap();

    let inner_buy = ex.resting()[1].order_id.clone();
    ex.fill_order(&inner_buy, Size::from(100)).unwrap();
    assert_eq!(ex.delta().unwrap(), 100);

    ex.clear_calls();
    m.tick().unwrap();
    assert_eq!(
        ex.calls(),
        vec![PaperCall::Create(vec![DesiredOrder::new(
            Side::Buy,
            p(dec!(100.0)),
            Size::from(100)
        )])]
    );
}

#[test]
fn test_impact_quotes_once_flow_is_sufficient() {
    let ex = paper();
    ex.set_book(book(
        &[(dec!(100.0), 400), (dec!(99.5), 200)],
        &[(dec!(100.5), 40), (dec!(101.0), 50)],
    ));
    ex.push_trades(balanced_trades(15));

    let mut m = manager(config(), &ex);
    assert_eq!(m.strategy_name(), "impact");
    m.tick().unwrap();

    let resting = ex.resting();
    assert_eq!(resting.len(), 2);
    assert_eq!(prices(&resting, Side::Buy), vec![p(dec!(99.0))]);
    assert_eq!(prices(&resting, Side::Sell), vec![p(dec!(101.0))]);
    assert!(resting.iter().all(|o| o.leaves_qty == Size::from(100)));
}

#[test]
fn test_thin_flow_falls_back_to_ladder() {
    let ex = paper();
    ex.push_trades(balanced_trades(5));
    let mut m = manager(config(), &ex);
    m.tick().unwrap();
    assert_eq!(ex.resting().len(), 4);
}

/// Moves the market about 2% lower so every ladder order needs an amend.
fn shift_book_down(ex: &impact_executor::PaperExchange) {
    ex.set_book(book(
        &[(dec!(98.0), 400), (dec!(97.5), 200)],
        &[(dec!(98.5), 40), (dec!(99.0), 50)],
    ));
}

#[test]
fn test_amend_race_retries_full_tick() {
    let ex = paper();
    let mut m = manager(config(), &ex);
    m.tick().unwrap();

    shift_book_down(&ex);
    ex.fail_next_amend(ExchangeError::StaleOrder("Invalid ordStatus".into()));
    ex.clear_calls();

    let outcome = m.tick().unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Converged(ConvergeSummary {
            amended: 4,
            created: 0,
            cancelled: 0,
        })
    );
    let amends = ex
        .calls()
        .into_iter()
        .filter(|c| matches!(c, PaperCall::Amend(_)))
        .count();
    assert_eq!(amends, 2);

    let resting = ex.resting();
    assert_eq!(prices(&resting, Side::Buy), vec![p(dec!(97.5)), p(dec!(98.0))]);
    assert_eq!(prices(&resting, Side::Sell), vec![p(dec!(99.0)), p(dec!(98.5))]);
}

#[test]
fn test_unknown_amend_error_is_fatal_and_cancels_on_drop() {
    let ex = paper();
    {
        let mut m = manager(config(), &ex);
        m.tick().unwrap();

        shift_book_down(&ex);
        ex.fail_next_amend(ExchangeError::Rejected("Invalid price".into()));
        let err = m.tick().unwrap_err();
        assert!(matches!(err, AppError::FatalAmend(ExchangeError::Rejected(_))));
        assert_eq!(ex.resting().len(), 4);
    }
    assert!(ex.resting().is_empty());
}

#[test]
fn test_sanity_failures() {
    let ex = paper();
    let m = manager(config(), &ex);
    ex.set_market_open(false);
    assert!(matches!(m.sanity_check(), Err(AppError::SanityCheck(_))));

    ex.set_market_open(true);
    ex.set_book(book(&[(dec!(100.0), 10)], &[]));
    assert!(matches!(m.sanity_check(), Err(AppError::SanityCheck(_))));

    // A locked book leaves no room inside the ticker.
    ex.set_book(book(&[(dec!(100.0), 10)], &[(dec!(100.0), 10)]));
    assert!(matches!(m.sanity_check(), Err(AppError::SanityCheck(_))));
}

#[test]
fn test_long_limit_suppresses_buys() {
    let ex = paper();
    ex.set_position(150);
    let mut cfg = config();
    cfg.runtime.strategy = StrategyKind::StaticLadder;
    cfg.maker.check_position_limits = true;
    cfg.maker.min_position = -100;
    cfg.maker.max_position = 100;

    let mut m = manager(cfg, &ex);
    m.tick().unwrap();
    let resting = ex.resting();
    assert_eq!(resting.len(), 2);
    assert!(resting.iter().all(|o| o.side == Side::Sell));
}

#[test]
fn test_dry_run_sends_nothing() {
    let ex = paper();
    let dry = Arc::new(DryRunExchange::new(ex.clone()));
    let mut cfg = config();
    cfg.runtime.dry_run = true;

    let mut m = OrderManager::new(cfg, dry).unwrap();
    let outcome = m.tick().unwrap();
    assert!(matches!(outcome, TickOutcome::Converged(s) if s.created == 4));
    // Dry run never sees its own orders, so it plans a full create every tick.
    assert!(matches!(m.tick().unwrap(), TickOutcome::Converged(s) if s.created == 4));
    drop(m);
    assert!(ex.calls().is_empty());
}

#[test]
fn test_dropped_connection_requests_restart_without_cancelling() {
    let ex = paper();
    {
        let mut m = manager(config(), &ex);
        m.tick().unwrap();
        ex.close_connection();
        assert_eq!(m.tick().unwrap(), TickOutcome::RestartRequested);
    }
    assert_eq!(ex.resting().len(), 4);
}
