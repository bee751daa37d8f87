//! End-to-end unlock flow over HTTP: node, wallet bridge and advisory services.

mod common;

use std::net::SocketAddr;

use common::*;
use premium_unlock::config::UnlockSettings;
use premium_unlock::gateway::{AdviceResult, HttpAdviceGateway, HttpAnalysisGateway};
use premium_unlock::ledger::{AlgodClient, RemoteWallet};
use premium_unlock::resilience::RetryPolicy;
use premium_unlock::unlock::AdvisoryState;
use premium_unlock::{UnlockError, UnlockOrchestrator, UnlockState};

#[derive(Clone, Copy)]
struct Scenario {
    connected: bool,
    user_signs: bool,
    /// Round reported once the payment confirms; `None` never confirms.
    confirmed_round: Option<u64>,
    analysis_up: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            connected: true,
            user_signs: true,
            confirmed_round: Some(5),
            analysis_up: true,
        }
    }
}

async fn start_services(scenario: Scenario) -> (SocketAddr, RequestLog) {
    start_programmable_backend(move |req| async move {
        let path = req.path.as_str();
        match (req.method.as_str(), path) {
            ("GET", "/session") => (
                200,
                serde_json::json!({"address": "ADDR1", "connected": scenario.connected})
                    .to_string(),
            ),
            ("POST", "/sign") => {
                let signed = if scenario.user_signs {
                    serde_json::json!(["c2lnbmVk"])
                } else {
                    serde_json::json!([null])
                };
                (200, serde_json::json!({ "signed": signed }).to_string())
            }
            ("GET", "/v2/transactions/params") => (200, params_body(4)),
            ("GET", "/v2/status") => (200, status_body(4)),
            ("POST", "/v2/transactions") => (200, r#"{"txId":"TX1"}"#.to_string()),
            ("GET", "/v2/transactions/pending/TX1") => {
                (200, pending_body(scenario.confirmed_round.unwrap_or(0)))
            }
            ("GET", "/api/analysis/ADDR1") if scenario.analysis_up => {
                (200, r#"{"total_value":1250}"#.to_string())
            }
            ("GET", "/api/analysis/ADDR1") => (500, "{}".to_string()),
            ("POST", "/api/advice") => (200, r#"{"advice":"Stack more."}"#.to_string()),
            ("GET", p) if p.starts_with("/v2/status/wait-for-block-after/") => {
                let round: u64 = p.rsplit('/').next().unwrap().parse().unwrap();
                (200, status_body(round + 1))
            }
            _ => (404, r#"{"message":"not found"}"#.to_string()),
        }
    })
    .await
}

async fn orchestrator(
    addr: SocketAddr,
) -> UnlockOrchestrator<AlgodClient, RemoteWallet, HttpAnalysisGateway, HttpAdviceGateway> {
    let ledger = AlgodClient::new(&ledger_config(addr), RetryPolicy::none()).unwrap();
    let wallet = RemoteWallet::connect(&wallet_config(addr)).await.unwrap();
    let analysis = HttpAnalysisGateway::new(&gateway_config(addr)).unwrap();
    let advice = HttpAdviceGateway::new(&gateway_config(addr)).unwrap();
    UnlockOrchestrator::new(ledger, wallet, analysis, advice, UnlockSettings::default())
}

#[tokio::test]
async fn test_unlock_then_advice() {
    let (addr, log) = start_services(Scenario::default()).await;
    let orchestrator = orchestrator(addr).await;

    let outcome = orchestrator.unlock().await.unwrap();
    assert_eq!(outcome.tx_id, "TX1");
    assert_eq!(outcome.confirmed_round, 5);
    assert_eq!(outcome.advice, AdviceResult::Ready("Stack more.".to_string()));

    assert_eq!(
        orchestrator.state(),
        UnlockState::Unlocked {
            tx_id: "TX1".to_string(),
            round: 5
        }
    );
    assert_eq!(
        orchestrator.advisory_state(),
        AdvisoryState::AdviceReady(AdviceResult::Ready("Stack more.".to_string()))
    );

    // The signed bytes went to the node unchanged.
    let requests = log.lock().unwrap();
    let submit = requests
        .iter()
        .find(|r| r.is("POST", "/v2/transactions"))
        .unwrap();
    assert_eq!(submit.body, b"signed".to_vec());
}

#[tokio::test]
async fn test_unconfirmed_payment_times_out() {
    let scenario = Scenario {
        confirmed_round: None,
        ..Default::default()
    };
    let (addr, log) = start_services(scenario).await;
    let orchestrator = orchestrator(addr).await;

    let err = orchestrator.unlock().await.unwrap_err();
    assert_eq!(
        err,
        UnlockError::ConfirmationTimeout {
            tx_id: "TX1".to_string(),
            rounds: 20
        }
    );
    assert!(matches!(orchestrator.state(), UnlockState::Failed(_)));
    assert_eq!(orchestrator.advisory_state(), AdvisoryState::NotStarted);
    assert_eq!(count(&log, "GET", "/v2/transactions/pending/TX1"), 20);
    assert_eq!(count(&log, "GET", "/api/analysis"), 0);
}

#[tokio::test]
async fn test_disconnected_wallet_never_reaches_node() {
    let scenario = Scenario {
        connected: false,
        ..Default::default()
    };
    let (addr, log) = start_services(scenario).await;
    let orchestrator = orchestrator(addr).await;

    let err = orchestrator.unlock().await.unwrap_err();
    assert_eq!(err, UnlockError::NoWalletConnected);
    assert_eq!(count(&log, "GET", "/v2/"), 0);
    assert_eq!(count(&log, "POST", "/sign"), 0);
}

#[tokio::test]
async fn test_declined_signature_never_submits() {
    let scenario = Scenario {
        user_signs: false,
        ..Default::default()
    };
    let (addr, log) = start_services(scenario).await;
    let orchestrator = orchestrator(addr).await;

    let err = orchestrator.unlock().await.unwrap_err();
    assert_eq!(err, UnlockError::SigningRejected);
    assert_eq!(count(&log, "POST", "/v2/transactions"), 0);
}

#[tokio::test]
async fn test_analysis_outage_keeps_unlock() {
    let scenario = Scenario {
        analysis_up: false,
        ..Default::default()
    };
    let (addr, log) = start_services(scenario).await;
    let orchestrator = orchestrator(addr).await;

    let outcome = orchestrator.unlock().await.unwrap();
    assert_eq!(outcome.advice, AdviceResult::SnapshotUnavailable);
    assert!(orchestrator.state().is_unlocked());
    assert_eq!(count(&log, "POST", "/api/advice"), 0);
}
