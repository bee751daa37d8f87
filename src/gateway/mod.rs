//! Advisory gateways.
//!
//! # Data Flow
//! ```text
//! address → analysis.rs (snapshot, JSON object)
//!     → advice.rs ({address, analysis} → {advice})
//! ```
//!
//! Both are single-call request/response clients. Any non-2xx answer,
//! transport error or undecodable body is `GatewayError::Unavailable`; the
//! caller decides whether that matters.

pub mod advice;
pub mod analysis;
pub mod types;

pub use advice::{AdviceGateway, HttpAdviceGateway};
pub use analysis::{AnalysisGateway, HttpAnalysisGateway};
pub use types::{AdviceResult, AnalysisSnapshot, GatewayError};
