#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use portfolio_api::config::GradingConfig;
use portfolio_api::services::providers::mock::MockRecognitionProvider;
use portfolio_api::services::{RecognitionProvider, SslLabsClient};
use portfolio_api::startup::{build_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;

pub struct TestApp {
    pub router: Router,
    pub ssl_labs: MockServer,
    pub recognizer: Arc<MockRecognitionProvider>,
}

impl TestApp {
    pub async fn spawn(recognizer: MockRecognitionProvider) -> Self {
        Self::spawn_with(recognizer, |state| state).await
    }

    /// Spawn with a hook to adjust the state before the router is built.
    pub async fn spawn_with<F>(recognizer: MockRecognitionProvider, customize: F) -> Self
    where
        F: FnOnce(AppState) -> AppState,
    {
        let ssl_labs = MockServer::start().await;
        let recognizer = Arc::new(recognizer);
        let grader = SslLabsClient::new(&GradingConfig {
            base_url: ssl_labs.uri(),
            max_age_hours: None,
            timeout_secs: 5,
        })
        .expect("Failed to build SSL Labs client");

        let state = customize(AppState::new(
            recognizer.clone() as Arc<dyn RecognitionProvider>,
            Arc::new(grader),
        ));

        TestApp {
            router: build_router(state),
            ssl_labs,
            recognizer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to handle request")
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Base64 of a PNG signature; providers never decode it in these tests.
pub const TINY_PNG_B64: &str = "iVBORw0KGgo=";
