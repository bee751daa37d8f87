//! Payment-gated premium unlock with advisory follow-up.
//!
//! A micro self-payment on the ledger unlocks the premium feature; once it
//! confirms, the session's portfolio snapshot is fetched and turned into
//! personalized advice.

pub mod config;
pub mod gateway;
pub mod ledger;
pub mod observability;
pub mod resilience;
pub mod unlock;

pub use config::UnlockConfig;
pub use unlock::{UnlockError, UnlockOrchestrator, UnlockOutcome, UnlockState};
