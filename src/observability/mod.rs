//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Ledger client, gateways and orchestrator produce:
//!     → logging.rs (structured log events, one span per unlock attempt)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by EnvFilter)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Attempt ID flows through every event of an unlock attempt
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;
