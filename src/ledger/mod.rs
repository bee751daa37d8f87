//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! client.rs   → fresh network params (per attempt)
//!     → types.rs (UnsignedTransaction::self_payment)
//!     → wallet.rs (user signs through the bridge)
//!     → client.rs (submit, then wait round by round for confirmation)
//! ```
//!
//! # Constraints
//! - Network params are never reused across attempts
//! - Signed payloads are never logged
//! - Every node call has a timeout; the signing wait does not

pub mod client;
pub mod types;
pub mod wallet;

pub use client::{AlgodClient, LedgerClient};
pub use types::{
    ConfirmationResult, LedgerError, LedgerResult, NetworkParams, SignOutcome, SignedTransaction,
    SubmissionReceipt, UnsignedTransaction,
};
pub use wallet::{RemoteWallet, WalletError, WalletSession};
