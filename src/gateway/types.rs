//! Advisory gateway types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of an analysis or advice call.
///
/// Never fatal to an unlock; the orchestrator turns it into an advice sentinel.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("{service} service unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

impl GatewayError {
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        GatewayError::Unavailable {
            service,
            reason: reason.into(),
        }
    }
}

/// Point-in-time portfolio summary for one address. The payload is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub address: String,
    pub data: serde_json::Value,
}

/// Result of the advisory sub-flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "advice", rename_all = "snake_case")]
pub enum AdviceResult {
    /// Guidance text from the advice service.
    Ready(String),
    /// No snapshot could be fetched, so no advice was requested.
    SnapshotUnavailable,
    /// The advice service failed or could not be reached.
    ServiceUnavailable,
}

impl AdviceResult {
    /// Whether this is one of the degraded sentinels.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, AdviceResult::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_result_json() {
        let ready = serde_json::to_value(AdviceResult::Ready("Stack more.".into())).unwrap();
        assert_eq!(ready["status"], "ready");
        assert_eq!(ready["advice"], "Stack more.");

        let down = serde_json::to_value(AdviceResult::ServiceUnavailable).unwrap();
        assert_eq!(down["status"], "service_unavailable");
    }

    #[test]
    fn test_sentinels() {
        assert!(AdviceResult::SnapshotUnavailable.is_degraded());
        assert!(AdviceResult::ServiceUnavailable.is_degraded());
        assert!(!AdviceResult::Ready("x".into()).is_degraded());
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::unavailable("advice", "returned 503");
        assert_eq!(err.to_string(), "advice service unavailable: returned 503");
    }
}
