//! Wallet sessions and transaction signing.
//!
//! # Security
//! - Keys never enter this process; signing happens behind the wallet bridge
//! - Signed payloads are never logged

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::WalletConfig;
use crate::ledger::types::{SignOutcome, SignedTransaction, UnsignedTransaction};

/// Errors raised while talking to a wallet.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    /// The bridge could not be reached or answered with an error status.
    #[error("Wallet bridge error: {0}")]
    Bridge(String),

    /// The bridge answered, but not with one entry per requested transaction.
    #[error("Malformed wallet response: {0}")]
    Malformed(String),
}

/// A connected signing identity, owned by the hosting application.
pub trait WalletSession: Send + Sync {
    fn address(&self) -> String;

    fn is_connected(&self) -> bool;

    /// Ask the user to sign a batch.
    ///
    /// The result has one entry per input, in order. This may wait on the
    /// user for an unbounded amount of time.
    fn sign_transactions(
        &self,
        unsigned: Vec<UnsignedTransaction>,
    ) -> impl Future<Output = Result<Vec<SignOutcome>, WalletError>> + Send;
}

impl<T: WalletSession> WalletSession for Arc<T> {
    fn address(&self) -> String {
        (**self).address()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn sign_transactions(
        &self,
        unsigned: Vec<UnsignedTransaction>,
    ) -> impl Future<Output = Result<Vec<SignOutcome>, WalletError>> + Send {
        (**self).sign_transactions(unsigned)
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    address: String,
    #[serde(default)]
    connected: bool,
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    transactions: &'a [UnsignedTransaction],
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    /// Base64 signed bytes, or null where the user declined.
    signed: Vec<Option<String>>,
}

/// Wallet session backed by an HTTP signing bridge.
#[derive(Clone)]
pub struct RemoteWallet {
    http: reqwest::Client,
    bridge_url: String,
    address: String,
    connected: bool,
}

impl RemoteWallet {
    /// Read the bridge's current session (address and connection state).
    pub async fn connect(config: &WalletConfig) -> Result<Self, WalletError> {
        // No request timeout: signing waits on the user.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| WalletError::Bridge(e.to_string()))?;
        let bridge_url = config.bridge_url.trim_end_matches('/').to_string();

        let resp = http
            .get(format!("{}/session", bridge_url))
            .send()
            .await
            .map_err(|e| WalletError::Bridge(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(WalletError::Bridge(format!("session returned {}", resp.status())));
        }
        let session: SessionResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::Malformed(e.to_string()))?;

        tracing::info!(
            address = %session.address,
            connected = session.connected,
            "Wallet session loaded"
        );

        Ok(Self {
            http,
            bridge_url,
            address: session.address,
            connected: session.connected,
        })
    }
}

impl WalletSession for RemoteWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn sign_transactions(
        &self,
        unsigned: Vec<UnsignedTransaction>,
    ) -> Result<Vec<SignOutcome>, WalletError> {
        let resp = self
            .http
            .post(format!("{}/sign", self.bridge_url))
            .json(&SignRequest {
                transactions: &unsigned,
            })
            .send()
            .await
            .map_err(|e| WalletError::Bridge(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WalletError::Bridge(format!("sign returned {}", resp.status())));
        }

        let body: SignResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::Malformed(e.to_string()))?;

        decode_sign_response(body.signed, unsigned.len())
    }
}

fn decode_sign_response(
    signed: Vec<Option<String>>,
    expected: usize,
) -> Result<Vec<SignOutcome>, WalletError> {
    if signed.len() != expected {
        return Err(WalletError::Malformed(format!(
            "expected {} entries, got {}",
            expected,
            signed.len()
        )));
    }

    signed
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(|bytes| SignOutcome::Signed(SignedTransaction { index, bytes }))
                .map_err(|e| WalletError::Malformed(format!("entry {}: {}", index, e))),
            None => Ok(SignOutcome::Rejected { index }),
        })
        .collect()
}

impl std::fmt::Debug for RemoteWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteWallet")
            .field("bridge_url", &self.bridge_url)
            .field("address", &self.address)
            .field("connected", &self.connected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mixed_response() {
        let outcomes =
            decode_sign_response(vec![None, Some("AQID".to_string())], 2).unwrap();
        assert_eq!(outcomes[0], SignOutcome::Rejected { index: 0 });
        assert_eq!(
            outcomes[1],
            SignOutcome::Signed(SignedTransaction {
                index: 1,
                bytes: vec![1, 2, 3]
            })
        );
    }

    #[test]
    fn test_decode_length_mismatch() {
        let err = decode_sign_response(vec![None], 2).unwrap_err();
        assert!(matches!(err, WalletError::Malformed(_)));
    }

    #[test]
    fn test_decode_bad_base64() {
        let err = decode_sign_response(vec![Some("!!".to_string())], 1).unwrap_err();
        assert!(err.to_string().contains("entry 0"));
    }
}
