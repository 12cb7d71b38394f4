//! Market making configuration.

use impact_core::Size;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MmError, MmResult};
use crate::ladder::compound;

/// Which quoting strategy drives the order manager.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Impact-optimal quotes, static ladder while flow data is thin.
    #[default]
    Impact,
    /// Geometric ladder around the ticker only.
    StaticLadder,
    /// Quote one level in front of the largest relative resting size.
    EdgePrice,
}

/// Market making configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Number of buy/sell pairs in the static ladder.
    #[serde(default = "default_order_pairs")]
    pub order_pairs: u32,

    /// Quantity of the innermost ladder order.
    #[serde(default = "default_order_start_size")]
    pub order_start_size: Size,

    /// Quantity added per ladder level. Also the size of impact quotes and
    /// the width of each inventory band.
    #[serde(default = "default_order_step_size")]
    pub order_step_size: Size,

    /// Draw ladder quantities uniformly from `[min_order_size, max_order_size]`.
    #[serde(default)]
    pub random_order_size: bool,

    #[serde(default = "default_min_order_size")]
    pub min_order_size: Size,

    #[serde(default = "default_max_order_size")]
    pub max_order_size: Size,

    /// Geometric spacing between ladder levels (0.005 = 0.5%).
    #[serde(default = "default_interval")]
    pub interval: Decimal,

    /// Minimum relative spread between the two start prices.
    #[serde(default = "default_min_spread")]
    pub min_spread: Decimal,

    /// Keep the touch when the best price on a side is already ours.
    #[serde(default = "default_true")]
    pub maintain_spreads: bool,

    /// Relative price change below which a resting order is left alone.
    #[serde(default = "default_relist_tolerance")]
    pub relist_tolerance: Decimal,

    /// Enforce `min_position`/`max_position`.
    #[serde(default)]
    pub check_position_limits: bool,

    #[serde(default = "default_min_position")]
    pub min_position: i64,

    #[serde(default = "default_max_position")]
    pub max_position: i64,

    /// Depth grid step for the impact optimizer and inventory shifts.
    #[serde(default = "default_price_granularity")]
    pub price_granularity: Decimal,

    /// Extra distance from mid so our own quote is never marketable.
    /// Defaults to twice the price granularity.
    #[serde(default)]
    pub anti_self_trade_buffer: Option<Decimal>,

    /// Sampling step for the impact curve.
    #[serde(default = "default_impact_curve_step")]
    pub impact_curve_step: Size,

    /// Maximum number of trades kept for flow statistics.
    #[serde(default = "default_trade_window_capacity")]
    pub trade_window_capacity: usize,

    /// Half-width of the inventory neutral zone. Defaults to the step size.
    #[serde(default)]
    pub inventory_neutral_size: Option<Size>,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            order_pairs: default_order_pairs(),
            order_start_size: default_order_start_size(),
            order_step_size: default_order_step_size(),
            random_order_size: false,
            min_order_size: default_min_order_size(),
            max_order_size: default_max_order_size(),
            interval: default_interval(),
            min_spread: default_min_spread(),
            maintain_spreads: true,
            relist_tolerance: default_relist_tolerance(),
            check_position_limits: false,
            min_position: default_min_position(),
            max_position: default_max_position(),
            price_granularity: default_price_granularity(),
            anti_self_trade_buffer: None,
            impact_curve_step: default_impact_curve_step(),
            trade_window_capacity: default_trade_window_capacity(),
            inventory_neutral_size: None,
        }
    }
}

impl MakerConfig {
    /// Buffer added beyond the optimal depth.
    pub fn anti_self_trade_buffer(&self) -> Decimal {
        self.anti_self_trade_buffer
            .unwrap_or(self.price_granularity * Decimal::TWO)
    }

    pub fn inventory_neutral_size(&self) -> Size {
        self.inventory_neutral_size.unwrap_or(self.order_step_size)
    }

    /// Reject inconsistent bounds.
    pub fn validate(&self) -> MmResult<()> {
        if self.price_granularity <= Decimal::ZERO {
            return Err(MmError::ConfigError(format!(
                "price_granularity must be positive, got {}",
                self.price_granularity
            )));
        }
        if !self.order_step_size.is_positive() {
            return Err(MmError::ConfigError(format!(
                "order_step_size must be positive, got {}",
                self.order_step_size
            )));
        }
        if !self.order_start_size.is_positive() {
            return Err(MmError::ConfigError(format!(
                "order_start_size must be positive, got {}",
                self.order_start_size
            )));
        }
        if self.inventory_neutral_size().is_negative() {
            return Err(MmError::ConfigError(
                "inventory_neutral_size must not be negative".to_string(),
            ));
        }
        if self.random_order_size && self.min_order_size > self.max_order_size {
            return Err(MmError::ConfigError(format!(
                "min_order_size {} exceeds max_order_size {}",
                self.min_order_size, self.max_order_size
            )));
        }
        if self.check_position_limits && self.min_position >= self.max_position {
            return Err(MmError::ConfigError(format!(
                "min_position {} must be below max_position {}",
                self.min_position, self.max_position
            )));
        }
        if !self.impact_curve_step.is_positive() {
            return Err(MmError::ConfigError(
                "impact_curve_step must be positive".to_string(),
            ));
        }
        if self.trade_window_capacity == 0 {
            return Err(MmError::ConfigError(
                "trade_window_capacity must be positive".to_string(),
            ));
        }
        if self.relist_tolerance < Decimal::ZERO || self.interval < Decimal::ZERO {
            return Err(MmError::ConfigError(
                "relist_tolerance and interval must not be negative".to_string(),
            ));
        }
        let pairs = i32::try_from(self.order_pairs).map_err(|_| {
            MmError::ConfigError(format!("order_pairs {} out of range", self.order_pairs))
        })?;
        if compound(Decimal::ONE, Decimal::ONE + self.interval, pairs).is_err() {
            return Err(MmError::ConfigError(format!(
                "interval {} over {} order_pairs overflows the ladder",
                self.interval, self.order_pairs
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_order_pairs() -> u32 {
    6
}
fn default_order_start_size() -> Size {
    Size::from(100)
}
fn default_order_step_size() -> Size {
    Size::from(100)
}
fn default_min_order_size() -> Size {
    Size::from(50)
}
fn default_max_order_size() -> Size {
    Size::from(200)
}
fn default_interval() -> Decimal {
    Decimal::new(5, 3) // 0.5%
}
fn default_min_spread() -> Decimal {
    Decimal::new(1, 2) // 1%
}
fn default_relist_tolerance() -> Decimal {
    Decimal::new(1, 2) // 1%
}
fn default_min_position() -> i64 {
    -10_000
}
fn default_max_position() -> i64 {
    10_000
}
fn default_price_granularity() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_impact_curve_step() -> Size {
    Size::from(5)
}
fn default_trade_window_capacity() -> usize {
    200
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = MakerConfig::default();
        assert_eq!(config.order_pairs, 6);
        assert_eq!(config.order_start_size, Size::from(100));
        assert_eq!(config.order_step_size, Size::from(100));
        assert!(!config.random_order_size);
        assert_eq!(config.interval, dec!(0.005));
        assert_eq!(config.min_spread, dec!(0.01));
        assert!(config.maintain_spreads);
        assert_eq!(config.relist_tolerance, dec!(0.01));
        assert!(!config.check_position_limits);
        assert_eq!(config.price_granularity, dec!(0.5));
        assert_eq!(config.anti_self_trade_buffer(), dec!(1.0));
        assert_eq!(config.inventory_neutral_size(), Size::from(100));
        assert_eq!(config.trade_window_capacity, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let toml_str = r#"
order_pairs = 3
order_step_size = "50"
anti_self_trade_buffer = "0.25"
"#;
        let config: MakerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.order_pairs, 3);
        assert_eq!(config.order_step_size, Size::from(50));
        assert_eq!(config.order_start_size, Size::from(100));
        assert_eq!(config.anti_self_trade_buffer(), dec!(0.25));
        assert_eq!(config.inventory_neutral_size(), Size::from(50));
    }

    #[test]
    fn test_validate_rejects_inverted_position_bounds() {
        let config = MakerConfig {
            check_position_limits: true,
            min_position: 100,
            max_position: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MmError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_random_bounds() {
        let config = MakerConfig {
            random_order_size: true,
            min_order_size: Size::from(300),
            max_order_size: Size::from(200),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_granularity() {
        let config = MakerConfig {
            price_granularity: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_ladder() {
        let config = MakerConfig {
            order_pairs: 100,
            interval: dec!(1.0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MmError::ConfigError(_))));

        let config = MakerConfig {
            order_pairs: 100,
            interval: dec!(0.005),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_kind_serde() {
        #[derive(Deserialize)]
        struct Wrap {
            strategy: StrategyKind,
        }
        let w: Wrap = toml::from_str(r#"strategy = "edge_price""#).unwrap();
        assert_eq!(w.strategy, StrategyKind::EdgePrice);
    }
}
