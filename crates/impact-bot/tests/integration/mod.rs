//! Integration tests for impact-bot.
//!
//! These tests drive the order manager against the paper venue:
//! - ladder placement and steady-state convergence
//! - amend races and fatal amend errors
//! - sanity failures and exit handling

pub mod common;
