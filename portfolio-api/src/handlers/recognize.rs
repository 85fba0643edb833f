use axum::{extract::rejection::JsonRejection, extract::State, Json};
use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine as _,
};
use service_core::error::AppError;

use crate::models::{RecognitionRequest, RecognitionResponse};
use crate::services::metrics::record_recognition;
use crate::services::preprocess;
use crate::services::providers::normalize_text;
use crate::startup::AppState;

/// Standard alphabet, padding optional. Browsers always pad, hand-written
/// clients and some tools do not.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the `image` field: strip an optional data-URL header and any
/// whitespace, then base64-decode.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, AppError> {
    let payload = match encoded.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| AppError::bad_request("Malformed data URL in image field"))?,
        None => encoded,
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|_| AppError::bad_request("Image data is not valid base64"))?;

    if bytes.is_empty() {
        return Err(AppError::bad_request("No image data provided"));
    }

    Ok(bytes)
}

#[tracing::instrument(skip(state, payload))]
pub async fn recognize_handwriting(
    State(state): State<AppState>,
    payload: Result<Json<RecognitionRequest>, JsonRejection>,
) -> Result<Json<RecognitionResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected recognition request body");
        AppError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let encoded = request
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("No image data provided"))?;

    let mut image = decode_image(encoded)?;

    if state.preprocess {
        image = tokio::task::spawn_blocking(move || preprocess::binarize(&image))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?
            .map_err(|e| {
                tracing::warn!(error = %e, "Image preprocessing failed");
                AppError::bad_request("Image could not be decoded")
            })?;
    }

    let provider = state.recognizer.name();

    match state.recognizer.recognize(&image).await {
        Ok(raw) => {
            let text = raw.as_deref().map(normalize_text).unwrap_or_default();
            if text.is_empty() {
                tracing::info!(provider, "No text detected");
                record_recognition(provider, "empty");
                Ok(Json(RecognitionResponse::empty()))
            } else {
                tracing::info!(provider, chars = text.len(), "Handwriting recognized");
                record_recognition(provider, "recognized");
                Ok(Json(RecognitionResponse::recognized(text)))
            }
        }
        Err(e) => {
            tracing::error!(provider, error = %e, "Error processing handwriting");
            record_recognition(provider, e.kind());
            Err(AppError::Upstream(e.user_message().to_string()))
        }
    }
}

/// Fallback for non-POST methods on the recognition routes.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_data_url_payloads() {
        assert_eq!(decode_image("SGVsbG8=").unwrap(), b"Hello");
        assert_eq!(
            decode_image("data:image/png;base64,SGVsbG8=").unwrap(),
            b"Hello"
        );
        assert_eq!(decode_image("SGVs\nbG8").unwrap(), b"Hello");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_image("not base64!!"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            decode_image("data:image/png;base64"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            decode_image("data:image/png;base64,"),
            Err(AppError::BadRequest(_))
        ));
    }
}
