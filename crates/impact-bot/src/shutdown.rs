//! Shutdown handling.
//!
//! The exit handler cancels every resting order on the way out. It is run
//! explicitly on a termination signal and again from `Drop` of the order
//! manager; the flag makes the second call a no-op.

use std::sync::atomic::{AtomicBool, Ordering};

use impact_executor::{DynExchange, ExchangeError};
use tracing::info;

pub struct ExitHandler {
    exchange: DynExchange,
    done: AtomicBool,
}

impl ExitHandler {
    pub fn new(exchange: DynExchange) -> Self {
        Self {
            exchange,
            done: AtomicBool::new(false),
        }
    }

    /// Cancel all orders, once. Returns false if it had already run.
    ///
    /// Never fails: cancellation errors are logged and swallowed.
    pub fn run(&self) -> bool {
        if self.done.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("Shutting down. All open orders will be cancelled.");
        match self.exchange.cancel_all_orders() {
            Ok(()) => {}
            Err(ExchangeError::Authentication) => {
                info!("Was not authenticated; could not cancel orders.");
            }
            Err(e) => info!(error = %e, "Unable to cancel orders"),
        }
        true
    }

    pub fn has_run(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ExitHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitHandler")
            .field("done", &self.has_run())
            .finish()
    }
}

/// Termination signals (Ctrl+C, and SIGTERM on unix).
///
/// Handlers are registered in `install`, so a signal that arrives while a
/// tick is running is held until the next `recv` instead of killing the
/// process with orders still resting.
#[derive(Debug)]
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register the handlers. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolve once a termination signal has been received.
    pub async fn recv(&mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => {
                    info!("Shutdown signal received (SIGINT/Ctrl+C)");
                }
                _ = self.terminate.recv() => {
                    info!("Shutdown signal received (SIGTERM)");
                }
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received (Ctrl+C)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impact_executor::{Exchange, PaperCall, PaperConfig, PaperExchange};
    use std::sync::Arc;

    #[test]
    fn test_runs_once() {
        let paper = Arc::new(PaperExchange::from_config(&PaperConfig::default()).unwrap());
        let handler = ExitHandler::new(paper.clone());
        assert!(handler.run());
        assert!(!handler.run());
        assert!(handler.has_run());
        assert_eq!(paper.calls(), vec![PaperCall::CancelAll]);
    }

    #[test]
    fn test_auth_failure_is_swallowed() {
        let paper = Arc::new(PaperExchange::from_config(&PaperConfig::default()).unwrap());
        paper.set_authenticated(false);
        let handler = ExitHandler::new(paper.clone());
        assert!(handler.run());
        assert!(paper.calls().is_empty());
        assert!(paper.is_connection_open());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_is_held_for_recv() {
        let mut signals = ShutdownSignal::install().unwrap();
        // Without the handler in place this would terminate the test binary.
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        tokio::time::timeout(std::time::Duration::from_secs(5), signals.recv())
            .await
            .unwrap();
    }
}
