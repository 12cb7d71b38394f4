//! Exchange and convergence error types.

use thiserror::Error;

/// Errors reported by the exchange collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The order changed state (filled or cancelled) between read and write.
    #[error("Stale order: {0}")]
    StaleOrder(String),

    #[error("Not authenticated")]
    Authentication,

    #[error("Orderbook is empty")]
    OrderbookEmpty,

    #[error("Market is closed")]
    MarketClosed,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl ExchangeError {
    /// True for the transient amend race that a re-tick resolves.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleOrder(_))
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors ending a convergence pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvergeError {
    /// Amend failed for a reason other than a stale order.
    #[error("Unknown error on amend: {0}")]
    FatalAmend(ExchangeError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

pub type ConvergeResult<T> = Result<T, ConvergeError>;
