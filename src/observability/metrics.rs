//! Metrics collection and exposition.
//!
//! # Metrics
//! - `unlock_attempts_total` (counter): unlock attempts that reached the ledger stage
//! - `unlock_outcomes_total` (counter): terminal outcomes by `outcome` label
//! - `unlock_confirmation_rounds` (histogram): rounds waited until confirmation
//! - `gateway_requests_total` (counter): analysis/advice calls by `service`, `status`
//! - `ledger_rpc_failures_total` (counter): failed node calls by `op`
//!
//! Without an installed recorder every call below is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_unlock_attempt() {
    metrics::counter!("unlock_attempts_total").increment(1);
}

/// Record a terminal unlock outcome (`unlocked`, `signing_rejected`, ...).
pub fn record_unlock_outcome(outcome: &'static str) {
    metrics::counter!("unlock_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_confirmation_rounds(rounds: u64) {
    metrics::histogram!("unlock_confirmation_rounds").record(rounds as f64);
}

pub fn record_gateway_request(service: &'static str, success: bool) {
    let status = if success { "ok" } else { "unavailable" };
    metrics::counter!("gateway_requests_total", "service" => service, "status" => status)
        .increment(1);
}

pub fn record_ledger_failure(op: &'static str) {
    metrics::counter!("ledger_rpc_failures_total", "op" => op).increment(1);
}
