//! Position limit predicates.

use tracing::info;

use crate::config::MakerConfig;

/// Checks net position against the configured bounds.
#[derive(Debug, Clone, Copy)]
pub struct PositionLimitGuard {
    enabled: bool,
    min_position: i64,
    max_position: i64,
}

/// Both limit flags for one position reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitFlags {
    pub long_exceeded: bool,
    pub short_exceeded: bool,
}

impl PositionLimitGuard {
    pub fn new(enabled: bool, min_position: i64, max_position: i64) -> Self {
        Self {
            enabled,
            min_position,
            max_position,
        }
    }

    pub fn from_config(config: &MakerConfig) -> Self {
        Self::new(
            config.check_position_limits,
            config.min_position,
            config.max_position,
        )
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn short_limit_exceeded(&self, position: i64) -> bool {
        self.enabled && position <= self.min_position
    }

    pub fn long_limit_exceeded(&self, position: i64) -> bool {
        self.enabled && position >= self.max_position
    }

    pub fn flags(&self, position: i64) -> LimitFlags {
        LimitFlags {
            long_exceeded: self.long_limit_exceeded(position),
            short_exceeded: self.short_limit_exceeded(position),
        }
    }

    /// Log which limit, if any, is hit.
    pub fn log_limits(&self, position: i64) {
        if self.long_limit_exceeded(position) {
            info!(position, max_position = self.max_position, "Long delta limit exceeded");
        }
        if self.short_limit_exceeded(position) {
            info!(position, min_position = self.min_position, "Short delta limit exceeded");
        }
    }
}
