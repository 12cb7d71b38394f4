//! Impact market maker - Entry Point

use anyhow::Result;
use clap::Parser;
use impact_bot::{
    build_exchange, AppConfig, AppResult, OrderManager, ShutdownSignal, TickOutcome,
};
use std::path::Path;
use tracing::{error, info, warn};

/// Impact market maker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via IMPACT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > IMPACT_CONFIG env var > default
    let config_path = AppConfig::resolve_path(args.config);
    let found = Path::new(&config_path).exists();
    let config = AppConfig::load(&config_path)?;

    impact_telemetry::init_logging(Some(&config.telemetry.log_filter))?;
    info!("Starting impact market maker v{}", env!("CARGO_PKG_VERSION"));
    if found {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
    }

    let signals = ShutdownSignal::install()?;
    match run(config, signals).await {
        Err(e) if e.is_clean_exit() => {
            error!(error = %e, "Exiting after failed sanity check");
            Ok(())
        }
        result => Ok(result?),
    }
}

/// Supervisor loop. Rebuilds the session whenever a tick asks for a restart
/// and returns once a termination signal arrives. The manager is dropped on
/// any error, which cancels resting orders.
async fn run(config: AppConfig, mut signals: ShutdownSignal) -> AppResult<()> {
    let interval = config.runtime.loop_interval();
    loop {
        let exchange = build_exchange(&config)?;
        let mut manager = OrderManager::new(config.clone(), exchange)?;
        info!(strategy = manager.strategy_name(), "Order manager ready");
        manager.reset()?;

        loop {
            if manager.tick()? == TickOutcome::RestartRequested {
                info!("Restarting the market maker...");
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = signals.recv() => {
                    manager.shutdown();
                    return Ok(());
                }
            }
        }
    }
}
