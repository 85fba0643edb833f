//! Application startup and lifecycle management.

use crate::config::{ApiConfig, RecognitionBackend, DEFAULT_MAX_BODY_BYTES};
use crate::handlers;
use crate::services::providers::{
    mock::MockRecognitionProvider, ocr_space::OcrSpaceProvider, vision::VisionProvider,
};
use crate::services::{GradingClient, RecognitionProvider, SslLabsClient};
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    cors::permissive_cors,
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimit},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub const RECOGNIZE_PATH: &str = "/api/recognize-handwriting";
pub const NETLIFY_RECOGNIZE_PATH: &str = "/.netlify/functions/recognize-handwriting";
pub const SSL_GRADE_PATH: &str = "/api/sslgrade";
pub const NETLIFY_SSL_GRADE_PATH: &str = "/.netlify/functions/sslgrade";

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state. Every field is immutable or internally
/// synchronized; requests never coordinate with each other.
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<dyn RecognitionProvider>,
    pub grader: Arc<dyn GradingClient>,
    pub preprocess: bool,
    pub rate_limiter: Option<IpRateLimit>,
    pub max_body_bytes: usize,
}

impl AppState {
    /// State with preprocessing and rate limiting off.
    pub fn new(recognizer: Arc<dyn RecognitionProvider>, grader: Arc<dyn GradingClient>) -> Self {
        Self {
            recognizer,
            grader,
            preprocess: false,
            rate_limiter: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let recognizer = build_recognizer(config)?;
        let grader = SslLabsClient::new(&config.grading).context("Failed to build SSL Labs client")?;

        tracing::info!(
            provider = recognizer.name(),
            preprocess = config.recognition.preprocess,
            ssl_labs = %config.grading.base_url,
            "Initialized upstream clients"
        );

        Ok(Self {
            recognizer,
            grader: Arc::new(grader),
            preprocess: config.recognition.preprocess,
            rate_limiter: create_ip_rate_limiter(config.recognition.rate_limit_per_min, 60)
                .map(|limiter| IpRateLimit::new(limiter, config.recognition.trust_forwarded_for)),
            max_body_bytes: config.max_body_bytes,
        })
    }
}

fn build_recognizer(config: &ApiConfig) -> anyhow::Result<Arc<dyn RecognitionProvider>> {
    let timeout = Duration::from_secs(config.recognition.timeout_secs);

    let provider: Arc<dyn RecognitionProvider> = match config.recognition.backend {
        RecognitionBackend::Vision => Arc::new(
            VisionProvider::new(&config.recognition.vision, timeout)
                .context("Failed to build Google Vision provider")?,
        ),
        RecognitionBackend::OcrSpace => {
            if config.recognition.ocr_space.using_demo_key {
                tracing::warn!(
                    "OCR_SPACE_API_KEY not set - using the public demo key, which has a small daily quota"
                );
            }
            Arc::new(
                OcrSpaceProvider::new(&config.recognition.ocr_space, timeout)
                    .context("Failed to build OCR.space provider")?,
            )
        }
        RecognitionBackend::Mock => {
            tracing::warn!("Using mock recognition provider - responses are canned");
            Arc::new(MockRecognitionProvider::default())
        }
    };

    Ok(provider)
}

/// Build the HTTP router for the given state.
pub fn build_router(state: AppState) -> Router {
    let recognition = Router::new()
        .route(
            RECOGNIZE_PATH,
            post(handlers::recognize_handwriting).fallback(handlers::method_not_allowed),
        )
        .route(
            NETLIFY_RECOGNIZE_PATH,
            post(handlers::recognize_handwriting).fallback(handlers::method_not_allowed),
        )
        .layer(from_fn_with_state(
            state.rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.max_body_bytes));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(SSL_GRADE_PATH, get(handlers::ssl_grade))
        .route(NETLIFY_SSL_GRADE_PATH, get(handlers::ssl_grade))
        .merge(recognition)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(permissive_cors())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    rate_limit_cleanup: Option<JoinHandle<()>>,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ApiConfig) -> anyhow::Result<Self> {
        let state = AppState::from_config(&config)?;
        Self::with_state(&config.common.bind_address(), state).await
    }

    /// Bind `address` (port 0 picks a random port) and serve `state`.
    pub async fn with_state(address: &str, state: AppState) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            e
        })?;
        let port = listener.local_addr()?.port();
        let rate_limit_cleanup = state
            .rate_limiter
            .as_ref()
            .map(|rate_limit| rate_limit.spawn_cleanup(RATE_LIMIT_CLEANUP_INTERVAL));

        Ok(Self {
            port,
            listener,
            router: build_router(state),
            rate_limit_cleanup,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        if let Some(cleanup) = self.rate_limit_cleanup {
            cleanup.abort();
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
