//! Public trade prints.

use crate::{Side, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trade print from the public tape.
///
/// `side` is the aggressor's side. `match_id` is unique per print and is the
/// dedup key for trade windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub size: Size,
    pub timestamp: DateTime<Utc>,
    pub match_id: String,
}

impl Trade {
    pub fn new(side: Side, size: Size, timestamp: DateTime<Utc>, match_id: impl Into<String>) -> Self {
        Self {
            side,
            size,
            timestamp,
            match_id: match_id.into(),
        }
    }

    /// Timestamp as fractional seconds since the epoch.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}
