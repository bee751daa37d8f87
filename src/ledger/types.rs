//! Ledger data types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport failure or unexpected node response.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Node request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node refused the submitted payload.
    #[error("Transaction rejected by node: {0}")]
    Rejected(String),

    /// The transaction was accepted, then dropped from the pool.
    #[error("Transaction dropped from pool: {0}")]
    PoolRejected(String),

    /// Response body did not match the expected shape.
    #[error("Malformed node response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Whether the node made a decision about the payload, as opposed to a transport failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::Rejected(_) | LedgerError::PoolRejected(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Suggested parameters for a transaction built right now.
///
/// The validity window is derived from the node's last round, so a set of
/// params goes stale within minutes and is fetched per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Flat fee, in the smallest currency unit.
    pub fee: u64,
    /// First round the transaction is valid in.
    pub first_valid: u64,
    /// Last round the transaction is valid in.
    pub last_valid: u64,
    pub genesis_id: String,
    /// Base64 genesis hash, as reported by the node.
    pub genesis_hash: String,
    pub consensus_version: String,
}

/// A payment that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub sender: String,
    pub receiver: String,
    /// Amount in the smallest currency unit.
    pub amount: u64,
    #[serde(with = "base64_bytes")]
    pub note: Vec<u8>,
    pub params: NetworkParams,
}

impl UnsignedTransaction {
    /// Build the unlock payment: `address` pays itself `amount` with `note`.
    pub fn self_payment(address: &str, amount: u64, note: &[u8], params: NetworkParams) -> Self {
        Self {
            sender: address.to_string(),
            receiver: address.to_string(),
            amount,
            note: note.to_vec(),
            params,
        }
    }
}

/// Signed bytes for one item of a signing batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Position of the item in the request batch.
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// Per-item result of a signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    Signed(SignedTransaction),
    /// The user declined to sign the item at `index`.
    Rejected { index: usize },
}

impl SignOutcome {
    pub fn into_signed(self) -> Option<SignedTransaction> {
        match self {
            SignOutcome::Signed(signed) => Some(signed),
            SignOutcome::Rejected { .. } => None,
        }
    }
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub transaction_id: String,
}

/// Terminal state of a bounded confirmation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResult {
    /// Included in the ledger at `round`.
    Confirmed { round: u64 },
    /// Not seen confirmed within `rounds` rounds. It may still confirm later.
    TimedOut { rounds: u64 },
}

/// Serde adapter storing bytes as a standard base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
