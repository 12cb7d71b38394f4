//! Shared builders for order manager tests.

use chrono::{TimeZone, Utc};
use impact_bot::{AppConfig, OrderManager};
use impact_core::{Book, Price, Side, Size, Trade};
use impact_executor::{PaperConfig, PaperExchange};
use rust_decimal::Decimal;
use std::sync::Arc;

pub fn p(v: Decimal) -> Price {
    Price::new(v)
}

/// Two ladder pairs, fast race retries, static defaults otherwise.
pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.maker.order_pairs = 2;
    config.runtime.race_retry_delay_ms = 1;
    config
}

/// Paper venue with the default book and an empty tape.
pub fn paper() -> Arc<PaperExchange> {
    Arc::new(
        PaperExchange::from_config(&PaperConfig {
            synthetic_trades: 0,
            ..Default::default()
        })
        .unwrap(),
    )
}

pub fn manager(config: AppConfig, paper: &Arc<PaperExchange>) -> OrderManager {
    OrderManager::new(config, paper.clone()).unwrap()
}

/// `per_side` unit-size prints on each side, one second apart.
pub fn balanced_trades(per_side: usize) -> Vec<Trade> {
    (0..per_side)
        .flat_map(|i| {
            let ts = Utc.timestamp_millis_opt(i as i64 * 1000).unwrap();
            [
                Trade::new(Side::Buy, Size::from(1), ts, format!("b{i}")),
                Trade::new(Side::Sell, Size::from(1), ts, format!("s{i}")),
            ]
        })
        .collect()
}

pub fn book(bids: &[(Decimal, i64)], asks: &[(Decimal, i64)]) -> Book {
    let side = |levels: &[(Decimal, i64)]| -> Vec<(Price, Size)> {
        levels.iter().map(|(px, sz)| (p(*px), Size::from(*sz))).collect()
    };
    Book::from_sides(&side(bids), &side(asks)).unwrap()
}
