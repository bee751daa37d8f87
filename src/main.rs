//! premium-unlock command line client.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────── UnlockOrchestrator ────────────────────────────┐
//!   │                                                                            │
//!   │  RemoteWallet ──sign──▶ AlgodClient ──submit/confirm──▶ Unlocked            │
//!   │                                                            │               │
//!   │                               HttpAnalysisGateway ◀────────┘               │
//!   │                                       │ (cached per session)               │
//!   │                                       ▼                                    │
//!   │                               HttpAdviceGateway ──▶ AdviceReady             │
//!   └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ctrl-C cancels the signing wait or confirmation poll of the running attempt.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use premium_unlock::config::loader::apply_env_overrides;
use premium_unlock::config::{load_config, UnlockConfig};
use premium_unlock::gateway::{HttpAdviceGateway, HttpAnalysisGateway};
use premium_unlock::ledger::{AlgodClient, ConfirmationResult, LedgerClient, RemoteWallet};
use premium_unlock::observability::{logging, metrics};
use premium_unlock::resilience::RetryPolicy;
use premium_unlock::{UnlockOrchestrator, UnlockState};

#[derive(Parser)]
#[command(name = "premium-unlock")]
#[command(about = "Pay to unlock premium portfolio advice", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pay for the unlock, wait for confirmation and print the advice
    Unlock,
    /// Print fresh network parameters
    Params,
    /// Wait for a submitted transaction to confirm
    Status {
        /// Transaction id reported by an earlier unlock
        tx_id: String,
        /// Rounds to wait (default: unlock.max_confirmation_rounds)
        #[arg(short, long)]
        rounds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = UnlockConfig::default();
            apply_env_overrides(&mut config);
            config
        }
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("premium-unlock v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let ledger = AlgodClient::new(&config.ledger, RetryPolicy::from(&config.retries))?;

    match cli.command {
        Commands::Params => {
            let params = ledger.network_parameters().await?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Commands::Status { tx_id, rounds } => {
            let rounds = rounds.unwrap_or(config.unlock.max_confirmation_rounds);
            let report = match ledger.await_confirmation(&tx_id, rounds).await? {
                ConfirmationResult::Confirmed { round } => {
                    json!({ "tx_id": tx_id, "status": "confirmed", "round": round })
                }
                ConfirmationResult::TimedOut { rounds } => {
                    json!({ "tx_id": tx_id, "status": "pending", "rounds_waited": rounds })
                }
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Unlock => run_unlock(&config, ledger).await?,
    }

    Ok(())
}

async fn run_unlock(
    config: &UnlockConfig,
    ledger: AlgodClient,
) -> Result<(), Box<dyn std::error::Error>> {
    let wallet = RemoteWallet::connect(&config.wallet).await?;
    let analysis = HttpAnalysisGateway::new(&config.gateways)?;
    let advice = HttpAdviceGateway::new(&config.gateways)?;

    let orchestrator =
        UnlockOrchestrator::new(ledger, wallet, analysis, advice, config.unlock.clone());

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling unlock");
            cancel.cancel();
        }
    });

    let mut states = orchestrator.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if state.is_busy() {
                eprintln!("{}", progress_label(&state));
            }
        }
    });

    match orchestrator.unlock().await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.advice.is_degraded() {
                eprintln!("Unlocked, but advice is unavailable right now. Try again later.");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            if let Some(tx_id) = e.transaction_id() {
                eprintln!("Transaction: {}", tx_id);
            }
            std::process::exit(1);
        }
    }
}

fn progress_label(state: &UnlockState) -> String {
    match state {
        UnlockState::BuildingTxn => "Preparing payment...".to_string(),
        UnlockState::AwaitingSignature => "Waiting for wallet signature...".to_string(),
        UnlockState::Submitting => "Submitting payment...".to_string(),
        UnlockState::AwaitingConfirmation { tx_id } => {
            format!("Waiting for {} to confirm...", tx_id)
        }
        other => format!("{:?}", other),
    }
}
