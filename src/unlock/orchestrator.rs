//! Payment-gated unlock state machine.
//!
//! # Responsibilities
//! - Build the unlock self-payment from freshly fetched network params
//! - Drive signing, submission and bounded confirmation polling
//! - After confirmation, run the advisory sub-flow once
//!
//! # Design Decisions
//! - Not re-entrant: overlapping calls fail fast with `InProgress`
//! - A confirmed unlock is recorded once and never paid for again
//! - A payment of unknown fate is re-polled before any new payment is built
//! - Advisory failures end in an `AdviceResult` sentinel, never an `UnlockError`
//! - Signing and confirmation waits race the session's `CancelHandle`

use std::sync::{Arc, OnceLock};
use tokio::sync::{watch, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::UnlockSettings;
use crate::gateway::{AdviceGateway, AdviceResult, AnalysisGateway, AnalysisSnapshot};
use crate::ledger::{
    ConfirmationResult, LedgerClient, LedgerError, SignOutcome, SignedTransaction,
    UnsignedTransaction, WalletSession,
};
use crate::observability::metrics;
use crate::unlock::cache::SnapshotCache;
use crate::unlock::cancel::{cancelled, CancelHandle};
use crate::unlock::state::{AdvisoryState, UnlockError, UnlockOutcome, UnlockState};

/// A payment the ledger has confirmed.
#[derive(Debug, Clone)]
struct ConfirmedUnlock {
    address: String,
    tx_id: String,
    round: u64,
}

/// Orchestrates one session's unlock payment and the advice that follows it.
pub struct UnlockOrchestrator<L, W, A, V> {
    ledger: L,
    wallet: W,
    analysis: A,
    advice: V,
    settings: UnlockSettings,
    /// Held for the whole of an operation; only ever try-locked.
    attempt: Mutex<()>,
    state: watch::Sender<UnlockState>,
    advisory: watch::Sender<AdvisoryState>,
    unlocked: OnceLock<ConfirmedUnlock>,
    snapshots: SnapshotCache,
    cancel: CancelHandle,
}

impl<L, W, A, V> UnlockOrchestrator<L, W, A, V>
where
    L: LedgerClient,
    W: WalletSession,
    A: AnalysisGateway,
    V: AdviceGateway,
{
    pub fn new(ledger: L, wallet: W, analysis: A, advice: V, settings: UnlockSettings) -> Self {
        let (state, _) = watch::channel(UnlockState::Idle);
        let (advisory, _) = watch::channel(AdvisoryState::NotStarted);

        Self {
            ledger,
            wallet,
            analysis,
            advice,
            settings,
            attempt: Mutex::new(()),
            state,
            advisory,
            unlocked: OnceLock::new(),
            snapshots: SnapshotCache::new(),
            cancel: CancelHandle::new(),
        }
    }

    /// Current payment state.
    pub fn state(&self) -> UnlockState {
        self.state.borrow().clone()
    }

    /// Current advisory state.
    pub fn advisory_state(&self) -> AdvisoryState {
        self.advisory.borrow().clone()
    }

    /// Observe payment state transitions.
    pub fn subscribe(&self) -> watch::Receiver<UnlockState> {
        self.state.subscribe()
    }

    /// Observe advisory state transitions.
    pub fn subscribe_advisory(&self) -> watch::Receiver<AdvisoryState> {
        self.advisory.subscribe()
    }

    /// Handle for abandoning the attempt in flight.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// The snapshot cached for this session's wallet, if one was fetched.
    pub fn cached_snapshot(&self) -> Option<Arc<AnalysisSnapshot>> {
        self.snapshots.get(&self.wallet.address())
    }

    /// Pay for the unlock, wait for confirmation, then fetch advice.
    ///
    /// Once unlocked, further calls return the recorded outcome without
    /// signing or submitting anything. If the previous attempt ended with a
    /// payment of unknown fate, that payment is polled again first and a new
    /// one is only built once it has timed out or been dropped.
    pub async fn unlock(&self) -> Result<UnlockOutcome, UnlockError> {
        let _guard = self.attempt.try_lock().map_err(|_| UnlockError::InProgress)?;

        if let Some(confirmed) = self.unlocked.get() {
            tracing::debug!(tx_id = %confirmed.tx_id, "Already unlocked, not paying again");
            return Ok(self.outcome(confirmed));
        }

        let attempt_id = Uuid::new_v4();
        async {
            let mut cancel_rx = self.cancel.arm();
            if let Some(tx_id) = self.pending_transaction() {
                match self.settle_pending(tx_id, &mut cancel_rx).await {
                    Ok(Some(confirmed)) => return Ok(self.complete(confirmed).await),
                    Ok(None) => {}
                    Err(e) => return Err(self.fail(e)),
                }
            }
            match self.pay(&mut cancel_rx).await {
                Ok(confirmed) => Ok(self.complete(confirmed).await),
                Err(e) => Err(self.fail(e)),
            }
        }
        .instrument(tracing::info_span!("unlock", %attempt_id))
        .await
    }

    /// Check again on a payment whose confirmation wait ended ambiguously.
    ///
    /// Polls the preserved transaction id for up to `max_rounds` rounds. Never
    /// re-signs or resubmits.
    pub async fn resume_confirmation(&self, max_rounds: u64) -> Result<UnlockOutcome, UnlockError> {
        let _guard = self.attempt.try_lock().map_err(|_| UnlockError::InProgress)?;

        if let Some(confirmed) = self.unlocked.get() {
            return Ok(self.outcome(confirmed));
        }
        let tx_id = self.pending_transaction().ok_or(UnlockError::NoPendingPayment)?;

        async {
            tracing::info!(max_rounds, "Resuming confirmation wait");
            let mut cancel_rx = self.cancel.arm();
            let address = self.wallet.address();
            match self.confirm(address, tx_id.clone(), max_rounds, &mut cancel_rx).await {
                Ok(confirmed) => Ok(self.complete(confirmed).await),
                Err(e) => Err(self.fail(e)),
            }
        }
        .instrument(tracing::info_span!("resume", %tx_id))
        .await
    }

    /// Run the advisory sub-flow again. Requires a confirmed unlock.
    pub async fn request_advice(&self) -> Result<AdviceResult, UnlockError> {
        let _guard = self.attempt.try_lock().map_err(|_| UnlockError::InProgress)?;
        let confirmed = self.unlocked.get().ok_or(UnlockError::NotUnlocked)?;
        Ok(self.run_advisory(&confirmed.address).await)
    }

    async fn pay(
        &self,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<ConfirmedUnlock, UnlockError> {
        if !self.wallet.is_connected() {
            return Err(UnlockError::NoWalletConnected);
        }
        let address = self.wallet.address();
        metrics::record_unlock_attempt();

        self.set_state(UnlockState::BuildingTxn);
        let params = self
            .ledger
            .network_parameters()
            .await
            .map_err(|e| ledger_failure(e, None))?;
        let txn = UnsignedTransaction::self_payment(
            &address,
            self.settings.amount,
            self.settings.note.as_bytes(),
            params,
        );

        self.set_state(UnlockState::AwaitingSignature);
        let signing = tokio::select! {
            biased;
            _ = cancelled(cancel) => None,
            result = self.wallet.sign_transactions(vec![txn]) => Some(result),
        };
        let Some(signing) = signing else {
            tracing::info!("Unlock cancelled while waiting for signature");
            return Err(UnlockError::Cancelled { tx_id: None });
        };
        let signed: Vec<SignedTransaction> = signing
            .map_err(|e| UnlockError::Network {
                reason: e.to_string(),
                tx_id: None,
            })?
            .into_iter()
            .filter_map(SignOutcome::into_signed)
            .collect();
        if signed.is_empty() {
            return Err(UnlockError::SigningRejected);
        }

        self.set_state(UnlockState::Submitting);
        let receipt = self
            .ledger
            .submit(&signed)
            .await
            .map_err(|e| ledger_failure(e, None))?;
        tracing::info!(tx_id = %receipt.transaction_id, "Unlock payment submitted");

        self.confirm(
            address,
            receipt.transaction_id,
            self.settings.max_confirmation_rounds,
            cancel,
        )
        .await
    }

    /// Poll a payment left pending by an earlier attempt.
    ///
    /// `Ok(None)` means it did not confirm within the round budget or the
    /// node dropped it, so a new payment may be built.
    async fn settle_pending(
        &self,
        tx_id: String,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<ConfirmedUnlock>, UnlockError> {
        tracing::info!(tx_id = %tx_id, "Checking earlier payment before paying again");
        let address = self.wallet.address();
        let result = self
            .confirm(address, tx_id, self.settings.max_confirmation_rounds, cancel)
            .await;

        match result {
            Ok(confirmed) => Ok(Some(confirmed)),
            Err(UnlockError::ConfirmationTimeout { tx_id, .. })
            | Err(UnlockError::SubmissionRejected {
                tx_id: Some(tx_id), ..
            }) => {
                tracing::warn!(tx_id = %tx_id, "Earlier payment did not confirm, building a new one");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn confirm(
        &self,
        address: String,
        tx_id: String,
        max_rounds: u64,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<ConfirmedUnlock, UnlockError> {
        self.set_state(UnlockState::AwaitingConfirmation {
            tx_id: tx_id.clone(),
        });

        let result = tokio::select! {
            biased;
            _ = cancelled(cancel) => None,
            result = self.ledger.await_confirmation(&tx_id, max_rounds) => Some(result),
        };
        let Some(result) = result else {
            tracing::info!(tx_id = %tx_id, "Stopped waiting for confirmation");
            return Err(UnlockError::Cancelled { tx_id: Some(tx_id) });
        };

        match result {
            Ok(ConfirmationResult::Confirmed { round }) => Ok(ConfirmedUnlock {
                address,
                tx_id,
                round,
            }),
            Ok(ConfirmationResult::TimedOut { rounds }) => {
                Err(UnlockError::ConfirmationTimeout { tx_id, rounds })
            }
            Err(e) => Err(ledger_failure(e, Some(tx_id))),
        }
    }

    /// Record the unlock, then run the advisory sub-flow.
    async fn complete(&self, confirmed: ConfirmedUnlock) -> UnlockOutcome {
        let confirmed = self.unlocked.get_or_init(|| confirmed);
        self.set_state(UnlockState::Unlocked {
            tx_id: confirmed.tx_id.clone(),
            round: confirmed.round,
        });
        metrics::record_unlock_outcome("unlocked");
        tracing::info!(
            tx_id = %confirmed.tx_id,
            round = confirmed.round,
            "Premium feature unlocked"
        );

        let advice = self.run_advisory(&confirmed.address).await;
        UnlockOutcome {
            tx_id: confirmed.tx_id.clone(),
            confirmed_round: confirmed.round,
            advice,
        }
    }

    fn fail(&self, error: UnlockError) -> UnlockError {
        metrics::record_unlock_outcome(error.kind());
        match error.transaction_id() {
            Some(tx_id) => tracing::warn!(tx_id, error = %error, "Unlock failed after submission"),
            None => tracing::info!(error = %error, "Unlock failed"),
        }
        self.set_state(UnlockState::Failed(error.clone()));
        error
    }

    async fn run_advisory(&self, address: &str) -> AdviceResult {
        let result = self.advise(address).await;
        self.advisory
            .send_replace(AdvisoryState::AdviceReady(result.clone()));
        result
    }

    async fn advise(&self, address: &str) -> AdviceResult {
        let snapshot = match self.snapshots.get(address) {
            Some(snapshot) => {
                tracing::debug!(address, "Using cached analysis snapshot");
                snapshot
            }
            None => {
                self.advisory.send_replace(AdvisoryState::FetchingSnapshot);
                match self.analysis.fetch(address).await {
                    Ok(fetched) => {
                        let fetched = Arc::new(fetched);
                        self.snapshots.insert(fetched.clone());
                        fetched
                    }
                    Err(e) => {
                        tracing::warn!(address, error = %e, "Snapshot unavailable, skipping advice");
                        return AdviceResult::SnapshotUnavailable;
                    }
                }
            }
        };

        self.advisory.send_replace(AdvisoryState::RequestingAdvice);
        match self.advice.request(address, &snapshot).await {
            Ok(text) => AdviceResult::Ready(text),
            Err(e) => {
                tracing::warn!(address, error = %e, "Advice service unavailable");
                AdviceResult::ServiceUnavailable
            }
        }
    }

    fn outcome(&self, confirmed: &ConfirmedUnlock) -> UnlockOutcome {
        let advice = match &*self.advisory.borrow() {
            AdvisoryState::AdviceReady(result) => result.clone(),
            _ => AdviceResult::ServiceUnavailable,
        };
        UnlockOutcome {
            tx_id: confirmed.tx_id.clone(),
            confirmed_round: confirmed.round,
            advice,
        }
    }

    /// Transaction id of an ambiguous failure, if that is the current state.
    fn pending_transaction(&self) -> Option<String> {
        match &*self.state.borrow() {
            UnlockState::Failed(e) if e.is_ambiguous() => e.transaction_id().map(str::to_string),
            _ => None,
        }
    }

    fn set_state(&self, next: UnlockState) {
        tracing::debug!(state = ?next, "Unlock state transition");
        self.state.send_replace(next);
    }
}

fn ledger_failure(error: LedgerError, tx_id: Option<String>) -> UnlockError {
    match error {
        LedgerError::Rejected(reason) | LedgerError::PoolRejected(reason) => {
            UnlockError::SubmissionRejected { reason, tx_id }
        }
        other => UnlockError::Network {
            reason: other.to_string(),
            tx_id,
        },
    }
}
