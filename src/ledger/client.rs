//! Ledger node client with timeout, failover and error handling.
//!
//! # Responsibilities
//! - Fetch suggested network parameters for a new transaction
//! - Submit signed transaction bytes
//! - Wait, round by round, for a submitted transaction to confirm
//! - Handle timeouts and network errors gracefully

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::LedgerConfig;
use crate::ledger::types::{
    ConfirmationResult, LedgerError, LedgerResult, NetworkParams, SignedTransaction,
    SubmissionReceipt,
};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Header carrying the node API token.
pub const API_TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Fee used when the node reports no minimum.
const DEFAULT_MIN_FEE: u64 = 1000;

/// Access to a ledger node, as seen by the unlock flow.
pub trait LedgerClient: Send + Sync {
    /// Fetch parameters for a transaction built right now. Never cache the result.
    fn network_parameters(&self) -> impl Future<Output = LedgerResult<NetworkParams>> + Send;

    /// Submit signed transactions, concatenated in batch-index order.
    fn submit(
        &self,
        signed: &[SignedTransaction],
    ) -> impl Future<Output = LedgerResult<SubmissionReceipt>> + Send;

    /// Poll for confirmation of `transaction_id` for at most `max_rounds` rounds.
    fn await_confirmation(
        &self,
        transaction_id: &str,
        max_rounds: u64,
    ) -> impl Future<Output = LedgerResult<ConfirmationResult>> + Send;
}

impl<T: LedgerClient> LedgerClient for Arc<T> {
    fn network_parameters(&self) -> impl Future<Output = LedgerResult<NetworkParams>> + Send {
        (**self).network_parameters()
    }

    fn submit(
        &self,
        signed: &[SignedTransaction],
    ) -> impl Future<Output = LedgerResult<SubmissionReceipt>> + Send {
        (**self).submit(signed)
    }

    fn await_confirmation(
        &self,
        transaction_id: &str,
        max_rounds: u64,
    ) -> impl Future<Output = LedgerResult<ConfirmationResult>> + Send {
        (**self).await_confirmation(transaction_id, max_rounds)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TransactionParamsResponse {
    #[serde(default)]
    consensus_version: String,
    genesis_hash: String,
    genesis_id: String,
    last_round: u64,
    #[serde(default)]
    min_fee: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct NodeStatusResponse {
    last_round: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PendingTransactionResponse {
    #[serde(default)]
    confirmed_round: Option<u64>,
    #[serde(default)]
    pool_error: String,
}

#[derive(Debug, Deserialize)]
struct PostTransactionsResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct NodeErrorResponse {
    message: String,
}

/// REST client for an algod-compatible node, with failover.
#[derive(Clone)]
pub struct AlgodClient {
    http: reqwest::Client,
    /// Primary node first, then failovers.
    nodes: Vec<String>,
    api_token: String,
    timeout_duration: Duration,
    validity_rounds: u64,
    retry: RetryPolicy,
}

impl AlgodClient {
    /// Create a new node client.
    ///
    /// Fails only if the primary URL is invalid; bad failover URLs are skipped.
    pub fn new(config: &LedgerConfig, retry: RetryPolicy) -> LedgerResult<Self> {
        let mut nodes = Vec::new();

        let primary: url::Url = config.node_url.parse().map_err(|e| {
            LedgerError::Rpc(format!("Invalid node URL '{}': {}", config.node_url, e))
        })?;
        nodes.push(primary.as_str().trim_end_matches('/').to_string());

        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => nodes.push(url.as_str().trim_end_matches('/').to_string()),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover node URL"),
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LedgerError::Rpc(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            node_url = %config.node_url,
            failovers = nodes.len() - 1,
            "Ledger client initialized"
        );

        Ok(Self {
            http,
            nodes,
            api_token: config.api_token.clone(),
            timeout_duration: Duration::from_secs(config.request_timeout_secs),
            validity_rounds: config.validity_rounds,
            retry,
        })
    }

    /// Latest round known to the node.
    pub async fn last_round(&self) -> LedgerResult<u64> {
        let status: NodeStatusResponse = self.read("get status", "v2/status").await?;
        Ok(status.last_round)
    }

    /// Idempotent GET across all nodes, retried in sweeps with backoff.
    async fn read<T: DeserializeOwned>(&self, op: &'static str, path: &str) -> LedgerResult<T> {
        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                sleep(self.retry.delay_for(attempt)).await;
            }
            for (i, node) in self.nodes.iter().enumerate() {
                match self.get_json(node, path).await {
                    Ok(result) => return Ok(result),
                    Err(e) => {
                        tracing::warn!(provider_idx = i, op, attempt, error = %e, "Node read failed");
                        metrics::record_ledger_failure(op);
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(LedgerError::Rpc(match last_error {
            Some(e) => format!("All nodes failed to {}: {}", op, e),
            None => format!("All nodes failed to {}", op),
        }))
    }

    async fn get_json<T: DeserializeOwned>(&self, node: &str, path: &str) -> LedgerResult<T> {
        let url = format!("{}/{}", node, path);
        let fut = async {
            let resp = self
                .http
                .get(&url)
                .header(API_TOKEN_HEADER, &self.api_token)
                .send()
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(LedgerError::Rpc(format!(
                    "{} returned {}: {}",
                    path,
                    status,
                    node_message(&body)
                )));
            }

            resp.json::<T>()
                .await
                .map_err(|e| LedgerError::Decode(e.to_string()))
        };

        match timeout(self.timeout_duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(self.timeout_duration.as_secs())),
        }
    }

    async fn post_raw(&self, node: &str, payload: Vec<u8>) -> LedgerResult<SubmissionReceipt> {
        let url = format!("{}/v2/transactions", node);
        let fut = async {
            let resp = self
                .http
                .post(&url)
                .header(API_TOKEN_HEADER, &self.api_token)
                .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
                .body(payload)
                .send()
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?;

            let status = resp.status();
            if status.is_client_error() {
                let body = resp.text().await.unwrap_or_default();
                return Err(LedgerError::Rejected(node_message(&body)));
            }
            if !status.is_success() {
                return Err(LedgerError::Rpc(format!("submit returned {}", status)));
            }

            let body: PostTransactionsResponse = resp
                .json()
                .await
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
            Ok(SubmissionReceipt {
                transaction_id: body.tx_id,
            })
        };

        match timeout(self.timeout_duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(self.timeout_duration.as_secs())),
        }
    }
}

impl LedgerClient for AlgodClient {
    async fn network_parameters(&self) -> LedgerResult<NetworkParams> {
        let raw: TransactionParamsResponse =
            self.read("get params", "v2/transactions/params").await?;

        Ok(NetworkParams {
            fee: raw.min_fee.max(DEFAULT_MIN_FEE),
            first_valid: raw.last_round,
            last_valid: raw.last_round.saturating_add(self.validity_rounds),
            genesis_id: raw.genesis_id,
            genesis_hash: raw.genesis_hash,
            consensus_version: raw.consensus_version,
        })
    }

    async fn submit(&self, signed: &[SignedTransaction]) -> LedgerResult<SubmissionReceipt> {
        if signed.is_empty() {
            return Err(LedgerError::Rejected("empty transaction group".to_string()));
        }

        let mut ordered: Vec<&SignedTransaction> = signed.iter().collect();
        ordered.sort_by_key(|s| s.index);
        let payload: Vec<u8> = ordered.iter().flat_map(|s| s.bytes.iter().copied()).collect();

        let mut last_error = None;
        for (i, node) in self.nodes.iter().enumerate() {
            match self.post_raw(node, payload.clone()).await {
                Ok(receipt) => {
                    tracing::info!(
                        provider_idx = i,
                        tx_id = %receipt.transaction_id,
                        "Transaction submitted"
                    );
                    return Ok(receipt);
                }
                Err(e) if e.is_rejection() => {
                    tracing::warn!(provider_idx = i, error = %e, "Node rejected transaction");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(provider_idx = i, error = %e, "Submit failed, trying next node");
                    metrics::record_ledger_failure("submit");
                    last_error = Some(e);
                }
            }
        }

        Err(LedgerError::Rpc(match last_error {
            Some(e) => format!("All nodes failed to submit: {}", e),
            None => "All nodes failed to submit".to_string(),
        }))
    }

    async fn await_confirmation(
        &self,
        transaction_id: &str,
        max_rounds: u64,
    ) -> LedgerResult<ConfirmationResult> {
        let start_round = self.last_round().await?.saturating_add(1);
        let pending_path = format!("v2/transactions/pending/{}", transaction_id);

        for waited in 0..max_rounds {
            let current_round = start_round.saturating_add(waited);
            let pending: PendingTransactionResponse =
                self.read("get pending transaction", &pending_path).await?;

            if let Some(round) = pending.confirmed_round.filter(|r| *r > 0) {
                metrics::record_confirmation_rounds(waited + 1);
                return Ok(ConfirmationResult::Confirmed { round });
            }
            if !pending.pool_error.is_empty() {
                return Err(LedgerError::PoolRejected(pending.pool_error));
            }

            tracing::debug!(tx_id = %transaction_id, round = current_round, "Transaction pending");

            let _: NodeStatusResponse = self
                .read(
                    "wait for block",
                    &format!("v2/status/wait-for-block-after/{}", current_round),
                )
                .await?;
        }

        tracing::warn!(tx_id = %transaction_id, rounds = max_rounds, "Confirmation round budget exhausted");
        Ok(ConfirmationResult::TimedOut { rounds: max_rounds })
    }
}

/// Extract `message` from a node error body, falling back to the raw text.
fn node_message(body: &str) -> String {
    serde_json::from_str::<NodeErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl std::fmt::Debug for AlgodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgodClient")
            .field("nodes", &self.nodes)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .field("validity_rounds", &self.validity_rounds)
            .finish()
    }
}
