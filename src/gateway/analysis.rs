//! Portfolio analysis gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::gateway::types::{AnalysisSnapshot, GatewayError};
use crate::observability::metrics;

const SERVICE: &str = "analysis";

/// Fetches a portfolio analysis snapshot for an address.
pub trait AnalysisGateway: Send + Sync {
    fn fetch(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<AnalysisSnapshot, GatewayError>> + Send;
}

impl<T: AnalysisGateway> AnalysisGateway for Arc<T> {
    fn fetch(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<AnalysisSnapshot, GatewayError>> + Send {
        (**self).fetch(address)
    }
}

/// `GET {analysis_url}/{address}` returning a JSON object.
#[derive(Debug, Clone)]
pub struct HttpAnalysisGateway {
    http: reqwest::Client,
    base_url: url::Url,
}

impl HttpAnalysisGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut base_url: url::Url = config
            .analysis_url
            .parse()
            .map_err(|e| GatewayError::unavailable(SERVICE, format!("invalid URL: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::unavailable(SERVICE, e.to_string()))?;

        Ok(Self { http, base_url })
    }

    async fn try_fetch(&self, address: &str) -> Result<AnalysisSnapshot, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::unavailable(SERVICE, "base URL cannot hold a path"))?
            .pop_if_empty()
            .push(address);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(SERVICE, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::unavailable(SERVICE, format!("returned {}", status)));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::unavailable(SERVICE, format!("bad body: {}", e)))?;
        if !data.is_object() {
            return Err(GatewayError::unavailable(SERVICE, "snapshot is not a JSON object"));
        }

        Ok(AnalysisSnapshot {
            address: address.to_string(),
            data,
        })
    }
}

impl AnalysisGateway for HttpAnalysisGateway {
    async fn fetch(&self, address: &str) -> Result<AnalysisSnapshot, GatewayError> {
        let result = self.try_fetch(address).await;
        metrics::record_gateway_request(SERVICE, result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(address, error = %e, "Analysis fetch failed");
        }
        result
    }
}
