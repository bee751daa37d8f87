//! Personalized advice gateway.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::gateway::types::{AnalysisSnapshot, GatewayError};
use crate::observability::metrics;

const SERVICE: &str = "advice";

/// Turns an analysis snapshot into guidance text.
pub trait AdviceGateway: Send + Sync {
    fn request(
        &self,
        address: &str,
        snapshot: &AnalysisSnapshot,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}

impl<T: AdviceGateway> AdviceGateway for Arc<T> {
    fn request(
        &self,
        address: &str,
        snapshot: &AnalysisSnapshot,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send {
        (**self).request(address, snapshot)
    }
}

#[derive(Debug, Serialize)]
struct AdviceRequest<'a> {
    address: &'a str,
    analysis: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AdviceResponse {
    advice: String,
}

/// `POST {advice_url}` with `{address, analysis}`, answered by `{advice}`.
#[derive(Debug, Clone)]
pub struct HttpAdviceGateway {
    http: reqwest::Client,
    url: url::Url,
}

impl HttpAdviceGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let url = config
            .advice_url
            .parse()
            .map_err(|e| GatewayError::unavailable(SERVICE, format!("invalid URL: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::unavailable(SERVICE, e.to_string()))?;

        Ok(Self { http, url })
    }

    async fn try_request(
        &self,
        address: &str,
        snapshot: &AnalysisSnapshot,
    ) -> Result<String, GatewayError> {
        let resp = self
            .http
            .post(self.url.clone())
            .json(&AdviceRequest {
                address,
                analysis: &snapshot.data,
            })
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(SERVICE, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::unavailable(SERVICE, format!("returned {}", status)));
        }

        let body: AdviceResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::unavailable(SERVICE, format!("bad body: {}", e)))?;
        Ok(body.advice)
    }
}

impl AdviceGateway for HttpAdviceGateway {
    async fn request(
        &self,
        address: &str,
        snapshot: &AnalysisSnapshot,
    ) -> Result<String, GatewayError> {
        let result = self.try_request(address, snapshot).await;
        metrics::record_gateway_request(SERVICE, result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(address, error = %e, "Advice request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let data = serde_json::json!({"total": 42});
        let body = serde_json::to_value(AdviceRequest {
            address: "ADDR1",
            analysis: &data,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"address": "ADDR1", "analysis": {"total": 42}}));
    }

    #[test]
    fn test_invalid_url() {
        let config = GatewayConfig {
            advice_url: "no scheme".to_string(),
            ..Default::default()
        };
        assert!(HttpAdviceGateway::new(&config).is_err());
    }
}
