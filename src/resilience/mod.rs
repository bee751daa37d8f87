//! Resilience helpers for ledger reads.
//!
//! # Data Flow
//! ```text
//! Idempotent node read:
//!     → per-call timeout (tokio::time::timeout)
//!     → next node on failure
//!     → after a full sweep: backoff.rs delay, then sweep again
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline, except the user-controlled signing wait
//! - Only reads are retried; submission walks the node list once

pub mod backoff;

pub use backoff::{calculate_backoff, RetryPolicy};
