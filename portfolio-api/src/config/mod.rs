use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Public OCR.space key with a small daily quota, used when no key is set.
pub const OCR_SPACE_DEMO_KEY: &str = "helloworld";

pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub common: core_config::Config,
    pub recognition: RecognitionConfig,
    pub grading: GradingConfig,
    pub max_body_bytes: usize,
    pub otlp_endpoint: Option<String>,
}

/// Which upstream performs text recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionBackend {
    Vision,
    OcrSpace,
    Mock,
}

impl FromStr for RecognitionBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" | "google" | "google_vision" => Ok(RecognitionBackend::Vision),
            "ocr_space" | "ocrspace" | "ocr.space" => Ok(RecognitionBackend::OcrSpace),
            "mock" => Ok(RecognitionBackend::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown RECOGNITION_PROVIDER '{}' (expected vision, ocr_space or mock)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    pub backend: RecognitionBackend,
    pub vision: VisionConfig,
    pub ocr_space: OcrSpaceConfig,
    /// Threshold the image to black and white before forwarding it.
    pub preprocess: bool,
    pub timeout_secs: u64,
    /// Requests per minute per client IP; 0 disables limiting.
    pub rate_limit_per_min: u32,
    /// Key the rate limiter on `x-forwarded-for` rather than the peer address.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct OcrSpaceConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub language: String,
    /// True when no key was configured and the public demo key is in use.
    pub using_demo_key: bool,
}

#[derive(Debug, Clone)]
pub struct GradingConfig {
    pub base_url: String,
    /// Accept cached SSL Labs reports up to this age.
    pub max_age_hours: Option<u32>,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = common.is_production()
            || lookup("ENVIRONMENT").is_some_and(|v| v == "prod");
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let backend: RecognitionBackend = get("RECOGNITION_PROVIDER", Some("ocr_space"))?.parse()?;

        let vision_key = lookup("GOOGLE_VISION_API_KEY").filter(|k| !k.trim().is_empty());
        if backend == RecognitionBackend::Vision && vision_key.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GOOGLE_VISION_API_KEY is required when RECOGNITION_PROVIDER=vision"
            )));
        }

        let ocr_space_key = lookup("OCR_SPACE_API_KEY").filter(|k| !k.trim().is_empty());
        let using_demo_key = ocr_space_key.is_none();

        let max_age_hours = match lookup("SSL_LABS_MAX_AGE_HOURS") {
            Some(v) if !v.trim().is_empty() => Some(parse_number("SSL_LABS_MAX_AGE_HOURS", &v)?),
            _ => None,
        };

        Ok(ApiConfig {
            common,
            recognition: RecognitionConfig {
                backend,
                vision: VisionConfig {
                    api_key: vision_key.map(Secret::new),
                    base_url: get("GOOGLE_VISION_BASE_URL", Some("https://vision.googleapis.com"))?,
                },
                ocr_space: OcrSpaceConfig {
                    api_key: Secret::new(
                        ocr_space_key.unwrap_or_else(|| OCR_SPACE_DEMO_KEY.to_string()),
                    ),
                    base_url: get("OCR_SPACE_BASE_URL", Some("https://api.ocr.space"))?,
                    language: get("OCR_SPACE_LANGUAGE", Some("eng"))?,
                    using_demo_key,
                },
                preprocess: parse_bool(&get("RECOGNITION_PREPROCESS", Some("false"))?),
                timeout_secs: parse_number(
                    "RECOGNITION_TIMEOUT_SECS",
                    &get("RECOGNITION_TIMEOUT_SECS", Some("30"))?,
                )?,
                rate_limit_per_min: parse_number(
                    "RECOGNITION_RATE_LIMIT_PER_MIN",
                    &get("RECOGNITION_RATE_LIMIT_PER_MIN", Some("30"))?,
                )?,
                trust_forwarded_for: parse_bool(&get("TRUST_FORWARDED_FOR", Some("false"))?),
            },
            grading: GradingConfig {
                base_url: get("SSL_LABS_BASE_URL", Some("https://api.ssllabs.com"))?,
                max_age_hours,
                timeout_secs: parse_number(
                    "SSL_LABS_TIMEOUT_SECS",
                    &get("SSL_LABS_TIMEOUT_SECS", Some("60"))?,
                )?,
            },
            max_body_bytes: parse_number(
                "MAX_BODY_BYTES",
                &get("MAX_BODY_BYTES", Some(&DEFAULT_MAX_BODY_BYTES.to_string()))?,
            )?,
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if let Some(def) = default {
                Ok(def.to_string())
            } else if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} must be a number, got '{}'", key, value))
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
