//! Text recognition provider abstractions and implementations.
//!
//! Handlers only see the `RecognitionProvider` trait; which upstream answers
//! is decided once at startup from configuration.

pub mod mock;
pub mod ocr_space;
pub mod vision;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Message safe to show to the browser. Upstream details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::QuotaExceeded(_) => {
                "Recognition service quota exceeded. Please try again later."
            }
            ProviderError::InvalidCredentials(_) => "Recognition service rejected the API key.",
            ProviderError::Network(_) => "Could not reach the recognition service.",
            ProviderError::Api(_) | ProviderError::InvalidResponse(_) => {
                "Failed to process handwriting"
            }
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::QuotaExceeded(_) => "quota",
            ProviderError::InvalidCredentials(_) => "credentials",
            ProviderError::Network(_) => "network",
            ProviderError::Api(_) => "api",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Last-resort classification when the upstream gives us nothing but
    /// free text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();

        if lower.contains("quota")
            || lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("number of times")
        {
            ProviderError::QuotaExceeded(message)
        } else if lower.contains("api key")
            || lower.contains("apikey")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            ProviderError::InvalidCredentials(message)
        } else if lower.contains("timed out") || lower.contains("timeout") {
            ProviderError::Network(message)
        } else {
            ProviderError::Api(message)
        }
    }

    /// Classify an HTTP status from the upstream, falling back to the body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
        match status.as_u16() {
            429 => ProviderError::QuotaExceeded(detail),
            401 | 403 => match ProviderError::from_message(detail.clone()) {
                quota @ ProviderError::QuotaExceeded(_) => quota,
                _ => ProviderError::InvalidCredentials(detail),
            },
            _ => ProviderError::from_message(detail),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Trait for image-to-text recognition backends.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Provider name, used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Recognize text in an encoded image (PNG, JPEG, ...).
    ///
    /// `Ok(None)` or an empty string means the service found no text.
    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ProviderError>;
}

/// Collapse line breaks into single spaces and trim the result.
pub fn normalize_text(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace(['\n', '\r'], " ").trim().to_string()
}

/// Sniff the MIME type of an encoded image, defaulting to PNG (what the
/// drawing canvas produces).
pub fn image_mime(image: &[u8]) -> &'static str {
    match image::guess_format(image) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        _ => "image/png",
    }
}
