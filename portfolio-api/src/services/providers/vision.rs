//! Google Cloud Vision provider.
//!
//! Uses the REST `images:annotate` endpoint with `DOCUMENT_TEXT_DETECTION`,
//! which handles handwriting better than plain `TEXT_DETECTION`.

use super::{ProviderError, RecognitionProvider};
use crate::config::VisionConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Google Cloud Vision text provider.
pub struct VisionProvider {
    api_key: Secret<String>,
    base_url: String,
    client: Client,
}

impl VisionProvider {
    pub fn new(config: &VisionConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::InvalidCredentials("Google Vision API key not configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/v1/images:annotate", self.base_url)
    }
}

#[async_trait]
impl RecognitionProvider for VisionProvider {
    fn name(&self) -> &'static str {
        "vision"
    }

    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ProviderError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    feature_type: "DOCUMENT_TEXT_DETECTION",
                }],
            }],
        };

        tracing::debug!(image_bytes = image.len(), "Sending request to Google Vision API");

        let response = self
            .client
            .post(self.api_url())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Errors normally come back as {"error": {code, message, status}}.
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => envelope.error.classify(),
                Err(_) => ProviderError::from_status(status, &body),
            });
        }

        let api_response: AnnotateResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let Some(first) = api_response.responses.into_iter().next() else {
            return Ok(None);
        };

        if let Some(error) = first.error {
            return Err(error.classify());
        }

        Ok(first.full_text_annotation.map(|annotation| annotation.text))
    }
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: RpcStatus,
}

/// google.rpc.Status as rendered by the REST API. Per-image errors carry a
/// numeric gRPC code, top-level errors an HTTP code plus a status name.
#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl RpcStatus {
    fn classify(self) -> ProviderError {
        let detail = format!("{} ({})", self.message, self.code);
        match (self.status.as_deref(), self.code) {
            (Some("RESOURCE_EXHAUSTED"), _) | (None, 8) | (_, 429) => {
                ProviderError::QuotaExceeded(detail)
            }
            (Some("PERMISSION_DENIED" | "UNAUTHENTICATED"), _) | (None, 7 | 16) | (_, 401 | 403) => {
                ProviderError::InvalidCredentials(detail)
            }
            _ => ProviderError::from_message(detail),
        }
    }
}
