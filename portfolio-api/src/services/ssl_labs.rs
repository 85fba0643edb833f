//! SSL Labs assessment client.
//!
//! Reports are relayed to the browser untouched, so the response is kept as
//! a raw JSON value rather than a typed model.

use crate::config::GradingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("{0}")]
    Network(String),

    #[error("Invalid JSON from grading service: {0}")]
    InvalidResponse(String),
}

/// Trait for TLS grading backends.
#[async_trait]
pub trait GradingClient: Send + Sync {
    async fn analyze(&self, host: &str) -> Result<Value, GradingError>;
}

#[derive(Clone)]
pub struct SslLabsClient {
    client: Client,
    base_url: String,
    max_age_hours: Option<u32>,
}

impl SslLabsClient {
    pub fn new(config: &GradingConfig) -> Result<Self, GradingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GradingError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_age_hours: config.max_age_hours,
        })
    }

    fn query_params(&self, host: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("publish", "off".to_string()),
            ("fromCache", "on".to_string()),
            ("all", "done".to_string()),
            ("host", host.to_string()),
        ];
        if let Some(hours) = self.max_age_hours {
            params.push(("maxAge", hours.to_string()));
        }
        params
    }
}

#[async_trait]
impl GradingClient for SslLabsClient {
    async fn analyze(&self, host: &str) -> Result<Value, GradingError> {
        let url = format!("{}/api/v3/analyze", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(host))
            .send()
            .await
            .map_err(|e| GradingError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GradingError::Network(e.to_string()))?;

        let report: Value = serde_json::from_str(&body)
            .map_err(|e| GradingError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            // SSL Labs reports overload and invalid hosts as JSON too; the
            // browser widget knows how to show those.
            tracing::warn!(host = %host, status = %status, "SSL Labs returned a non-success status");
        } else {
            tracing::debug!(
                host = %host,
                assessment_status = report.get("status").and_then(serde_json::Value::as_str).unwrap_or("-"),
                "SSL Labs report received"
            );
        }

        Ok(report)
    }
}
