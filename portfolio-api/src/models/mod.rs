//! Request and response bodies for the proxy endpoints.

use serde::{Deserialize, Serialize};

/// Body of a handwriting recognition request.
#[derive(Debug, Default, Deserialize)]
pub struct RecognitionRequest {
    /// Base64 image, optionally with a `data:<mime>;base64,` prefix.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecognitionResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionResponse {
    pub const NO_TEXT_HINT: &'static str = "No text detected. Please write more clearly.";

    pub fn recognized(text: String) -> Self {
        Self { text, error: None }
    }

    pub fn empty() -> Self {
        Self {
            text: String::new(),
            error: Some(Self::NO_TEXT_HINT.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GradeQuery {
    pub host: Option<String>,
}
