//! Application configuration.

use crate::error::{AppError, AppResult};
use impact_executor::PaperConfig;
use impact_mm::{MakerConfig, StrategyKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tick loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Sleep between ticks (ms). Default: 5,000.
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    /// Wait before re-running a tick whose amend raced a fill (ms). Default: 500.
    #[serde(default = "default_race_retry_delay_ms")]
    pub race_retry_delay_ms: u64,
    /// Log order mutations instead of sending them.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub strategy: StrategyKind,
}

fn default_loop_interval_ms() -> u64 {
    5_000
}

fn default_race_retry_delay_ms() -> u64 {
    500
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: default_loop_interval_ms(),
            race_retry_delay_ms: default_race_retry_delay_ms(),
            dry_run: false,
            strategy: StrategyKind::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn race_retry_delay(&self) -> Duration {
        Duration::from_millis(self.race_retry_delay_ms)
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    impact_telemetry::logging::DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub maker: MakerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Resolve the config path: explicit argument > `IMPACT_CONFIG` > default.
    pub fn resolve_path(explicit: Option<String>) -> String {
        explicit
            .or_else(|| std::env::var("IMPACT_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string())
    }

    /// Load from a file, falling back to defaults when it does not exist.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> AppResult<()> {
        self.maker.validate()?;
        if !self.paper.tick_size.is_positive() {
            return Err(AppError::Config(format!(
                "paper.tick_size must be positive, got {}",
                self.paper.tick_size
            )));
        }
        if self.runtime.loop_interval_ms == 0 {
            return Err(AppError::Config(
                "runtime.loop_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impact_core::Size;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.runtime.loop_interval(), Duration::from_secs(5));
        assert_eq!(config.runtime.race_retry_delay(), Duration::from_millis(500));
        assert!(!config.runtime.dry_run);
        assert_eq!(config.runtime.strategy, StrategyKind::Impact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sections() {
        let config = AppConfig::from_toml(
            r#"
[maker]
order_pairs = 2
order_step_size = "25"

[runtime]
loop_interval_ms = 1000
dry_run = true
strategy = "static_ladder"

[paper]
symbol = "ETHUSD"
tick_size = "0.05"
synthetic_trades = 0
"#,
        )
        .unwrap();
        assert_eq!(config.maker.order_pairs, 2);
        assert_eq!(config.maker.order_step_size, Size::from(25));
        assert!(config.runtime.dry_run);
        assert_eq!(config.runtime.strategy, StrategyKind::StaticLadder);
        assert_eq!(config.runtime.race_retry_delay_ms, 500);
        assert_eq!(config.paper.symbol, "ETHUSD");
        assert_eq!(config.paper.synthetic_trades, 0);
        assert!(!config.paper.bids.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let err = AppConfig::from_toml(
            r#"
[maker]
check_position_limits = true
min_position = 100
max_position = 100
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Maker(_)));

        let mut config = AppConfig::default();
        config.runtime.loop_interval_ms = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        assert_eq!(
            AppConfig::resolve_path(Some("custom.toml".to_string())),
            "custom.toml"
        );
    }
}
