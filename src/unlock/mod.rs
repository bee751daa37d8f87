//! Payment-gated unlock and advisory orchestration.
//!
//! # Data Flow
//! ```text
//! orchestrator.rs
//!     → ledger (params → wallet signs → submit → confirm)
//!     → state.rs (UnlockState / UnlockError, watched by the host)
//!     → cache.rs (snapshot, once per session)
//!     → gateway (analysis → advice) → AdvisoryState
//! ```

pub mod cache;
pub mod cancel;
pub mod orchestrator;
pub mod state;

pub use cancel::CancelHandle;
pub use orchestrator::UnlockOrchestrator;
pub use state::{AdvisoryState, UnlockError, UnlockOutcome, UnlockState};
