//! OCR.space provider.
//!
//! The image travels as a data URL in a url-encoded form. Engine 2 is used
//! since it copes better with hand-drawn strokes than engine 1.

use super::{image_mime, ProviderError, RecognitionProvider};
use crate::config::OcrSpaceConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

/// OCR.space exit codes: 1 parsed, 2 partially parsed, 3 and 4 failed.
const EXIT_PARSED: i32 = 1;
const EXIT_PARTIAL: i32 = 2;

pub struct OcrSpaceProvider {
    api_key: Secret<String>,
    base_url: String,
    language: String,
    client: Client,
}

impl OcrSpaceProvider {
    pub fn new(config: &OcrSpaceConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            client,
        })
    }

    fn data_url(image: &[u8]) -> String {
        format!("data:{};base64,{}", image_mime(image), STANDARD.encode(image))
    }
}

#[async_trait]
impl RecognitionProvider for OcrSpaceProvider {
    fn name(&self) -> &'static str {
        "ocr_space"
    }

    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ProviderError> {
        let data_url = Self::data_url(image);
        let form = [
            ("apikey", self.api_key.expose_secret().as_str()),
            ("base64Image", data_url.as_str()),
            ("language", self.language.as_str()),
            ("OCREngine", "2"),
            ("scale", "true"),
            ("isOverlayRequired", "false"),
        ];

        tracing::debug!(image_bytes = image.len(), "Sending request to OCR.space");

        let response = self
            .client
            .post(format!("{}/parse/image", self.base_url))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Key and quota failures are sometimes plain text rather than JSON.
        let parsed: OcrSpaceResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(ProviderError::from_status(status, &body)),
            Err(e) => {
                return Err(ProviderError::InvalidResponse(format!(
                    "Failed to parse response: {}",
                    e
                )))
            }
        };

        if parsed.is_errored_on_processing
            || !matches!(parsed.ocr_exit_code, EXIT_PARSED | EXIT_PARTIAL)
        {
            let message = parsed
                .error_message
                .map(ErrorMessage::joined)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("OCR.space exit code {}", parsed.ocr_exit_code));
            return Err(if status.is_success() {
                ProviderError::from_message(message)
            } else {
                ProviderError::from_status(status, &message)
            });
        }

        let text = parsed
            .parsed_results
            .into_iter()
            .map(|r| r.parsed_text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "OCRExitCode", default)]
    ocr_exit_code: i32,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

/// `ErrorMessage` is a string on some failures and an array on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn joined(self) -> String {
        match self {
            ErrorMessage::One(message) => message,
            ErrorMessage::Many(messages) => messages.join("; "),
        }
    }
}
