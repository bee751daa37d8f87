//! Unlock and advisory states, errors and outcomes.
//!
//! # State Transitions
//! ```text
//! Idle → BuildingTxn → AwaitingSignature → Submitting
//!      → AwaitingConfirmation → Unlocked | Failed
//!
//! after Unlocked:
//! NotStarted → FetchingSnapshot (if not cached) → RequestingAdvice → AdviceReady
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::gateway::AdviceResult;

/// Position of the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnlockState {
    #[default]
    Idle,
    BuildingTxn,
    AwaitingSignature,
    Submitting,
    AwaitingConfirmation { tx_id: String },
    Unlocked { tx_id: String, round: u64 },
    Failed(UnlockError),
}

impl UnlockState {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, UnlockState::Unlocked { .. })
    }

    /// Whether a spinner is warranted: some step is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UnlockState::BuildingTxn
                | UnlockState::AwaitingSignature
                | UnlockState::Submitting
                | UnlockState::AwaitingConfirmation { .. }
        )
    }
}

/// Position of the advisory sub-flow. Independent of `UnlockState::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdvisoryState {
    #[default]
    NotStarted,
    FetchingSnapshot,
    RequestingAdvice,
    AdviceReady(AdviceResult),
}

/// Why an unlock attempt did not reach `Unlocked`.
///
/// Every variant raised after submission carries the transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnlockError {
    #[error("No wallet is connected. Connect a wallet to unlock.")]
    NoWalletConnected,

    #[error("The unlock payment was not signed.")]
    SigningRejected,

    #[error("{}", rejected_message(.reason, .tx_id.as_deref()))]
    SubmissionRejected {
        reason: String,
        tx_id: Option<String>,
    },

    #[error("Payment {tx_id} was not confirmed within {rounds} rounds. It may still confirm; check the transaction before paying again.")]
    ConfirmationTimeout { tx_id: String, rounds: u64 },

    #[error("{}", network_message(.reason, .tx_id.as_deref()))]
    Network {
        reason: String,
        tx_id: Option<String>,
    },

    #[error("{}", cancelled_message(.tx_id.as_deref()))]
    Cancelled { tx_id: Option<String> },

    #[error("An unlock is already in progress.")]
    InProgress,

    #[error("The premium feature has not been unlocked yet.")]
    NotUnlocked,

    #[error("There is no pending payment to check.")]
    NoPendingPayment,
}

fn rejected_message(reason: &str, tx_id: Option<&str>) -> String {
    match tx_id {
        Some(id) => format!("The network dropped payment {}: {}", id, reason),
        None => format!("The network rejected the unlock payment: {}", reason),
    }
}

fn network_message(reason: &str, tx_id: Option<&str>) -> String {
    match tx_id {
        Some(id) => format!("Network error after submitting payment {}: {}", id, reason),
        None => format!("Network error: {}", reason),
    }
}

fn cancelled_message(tx_id: Option<&str>) -> String {
    match tx_id {
        Some(id) => format!(
            "Stopped waiting for payment {}. It may still confirm; check the transaction before paying again.",
            id
        ),
        None => "The unlock was cancelled before any payment was sent.".to_string(),
    }
}

impl UnlockError {
    /// Id of the submitted transaction, if the failure happened after submission.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            UnlockError::ConfirmationTimeout { tx_id, .. } => Some(tx_id),
            UnlockError::SubmissionRejected { tx_id, .. }
            | UnlockError::Network { tx_id, .. }
            | UnlockError::Cancelled { tx_id } => tx_id.as_deref(),
            _ => None,
        }
    }

    /// Whether the payment's fate is unknown (submitted, not known to be confirmed or dropped).
    pub fn is_ambiguous(&self) -> bool {
        match self {
            UnlockError::ConfirmationTimeout { .. } => true,
            UnlockError::Network { tx_id, .. } | UnlockError::Cancelled { tx_id } => tx_id.is_some(),
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UnlockError::NoWalletConnected => "no_wallet_connected",
            UnlockError::SigningRejected => "signing_rejected",
            UnlockError::SubmissionRejected { .. } => "submission_rejected",
            UnlockError::ConfirmationTimeout { .. } => "confirmation_timeout",
            UnlockError::Network { .. } => "network_error",
            UnlockError::Cancelled { .. } => "cancelled",
            UnlockError::InProgress => "in_progress",
            UnlockError::NotUnlocked => "not_unlocked",
            UnlockError::NoPendingPayment => "no_pending_payment",
        }
    }
}

/// A confirmed unlock plus the advice produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockOutcome {
    pub tx_id: String,
    pub confirmed_round: u64,
    pub advice: AdviceResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_preserved() {
        let err = UnlockError::ConfirmationTimeout {
            tx_id: "TX1".to_string(),
            rounds: 20,
        };
        assert_eq!(err.transaction_id(), Some("TX1"));
        assert!(err.is_ambiguous());
        assert!(err.to_string().contains("TX1"));
        assert!(err.to_string().contains("20 rounds"));
    }

    #[test]
    fn test_pre_submission_errors_have_no_id() {
        assert_eq!(UnlockError::SigningRejected.transaction_id(), None);
        let err = UnlockError::Network {
            reason: "connection refused".to_string(),
            tx_id: None,
        };
        assert!(!err.is_ambiguous());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_cancel_message_depends_on_submission() {
        let before = UnlockError::Cancelled { tx_id: None };
        assert!(before.to_string().contains("before any payment"));

        let after = UnlockError::Cancelled {
            tx_id: Some("TX9".to_string()),
        };
        assert!(after.to_string().contains("TX9"));
        assert!(after.is_ambiguous());
    }

    #[test]
    fn test_busy_states() {
        assert!(!UnlockState::Idle.is_busy());
        assert!(UnlockState::AwaitingSignature.is_busy());
        assert!(!UnlockState::Failed(UnlockError::SigningRejected).is_busy());
        assert!(UnlockState::Unlocked {
            tx_id: "TX1".into(),
            round: 5
        }
        .is_unlocked());
    }
}
