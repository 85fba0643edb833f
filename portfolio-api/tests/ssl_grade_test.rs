mod common;

use axum::http::StatusCode;
use axum::body::Body;
use axum::http::Request;
use common::{body_json, TestApp, TINY_PNG_B64};
use portfolio_api::config::GradingConfig;
use portfolio_api::services::SslLabsClient;
use portfolio_api::startup::{build_router, AppState, RECOGNIZE_PATH};
use std::net::TcpListener;
use std::sync::Arc;
use tower::ServiceExt;
use portfolio_api::services::providers::mock::MockRecognitionProvider;
use portfolio_api::startup::{NETLIFY_SSL_GRADE_PATH, SSL_GRADE_PATH};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn spawn() -> TestApp {
    TestApp::spawn(MockRecognitionProvider::default()).await
}

fn grade_uri(host: &str) -> String {
    format!("{}?host={}", NETLIFY_SSL_GRADE_PATH, host)
}

#[tokio::test]
async fn missing_host_is_rejected() {
    let app = spawn().await;

    for uri in [
        NETLIFY_SSL_GRADE_PATH.to_string(),
        grade_uri(""),
        grade_uri("%20%20"),
    ] {
        let response = app.get(&uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["error"], "Missing host parameter");
    }
}

#[tokio::test]
async fn private_hosts_never_reach_ssl_labs() {
    let app = spawn().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&app.ssl_labs)
        .await;

    for host in ["localhost", "127.0.0.1", "192.168.1.5", "10.0.0.1", "172.20.0.1", "LocalHost"] {
        let response = app.get(&grade_uri(host)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{host}");
        assert_eq!(
            body_json(response).await["error"],
            "SSL Labs only supports public domains."
        );
    }
}

#[tokio::test]
async fn hosts_with_illegal_characters_are_invalid() {
    let app = spawn().await;

    let response = app.get(&grade_uri("example.com%2Fpath")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid host parameter");
}

#[tokio::test]
async fn public_host_report_is_relayed_unchanged() {
    let app = spawn().await;
    let report = json!({
        "host": "example.com",
        "status": "READY",
        "endpoints": [{ "ipAddress": "93.184.216.34", "grade": "A+" }]
    });
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .and(query_param("host", "example.com"))
        .and(query_param("publish", "off"))
        .and(query_param("fromCache", "on"))
        .and(query_param("all", "done"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report.clone()))
        .expect(1)
        .mount(&app.ssl_labs)
        .await;

    let response = app.get(&grade_uri("example.com")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, report);
}

#[tokio::test]
async fn host_is_normalized_and_172_outside_private_range_is_allowed() {
    let app = spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .and(query_param("host", "172.32.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "DNS" })))
        .expect(1)
        .mount(&app.ssl_labs)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .and(query_param("host", "example.org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "IN_PROGRESS" })))
        .expect(1)
        .mount(&app.ssl_labs)
        .await;

    let response = app.get(&grade_uri("172.32.0.1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "DNS");

    let response = app.get(&format!("{}?host=%20Example.ORG%20", SSL_GRADE_PATH)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "IN_PROGRESS");
}

#[tokio::test]
async fn upstream_error_json_is_relayed() {
    let app = spawn().await;
    let body = json!({ "errors": [{ "message": "Running at full capacity. Please try again later." }] });
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .respond_with(ResponseTemplate::new(529).set_body_json(body.clone()))
        .mount(&app.ssl_labs)
        .await;

    let response = app.get(&grade_uri("example.com")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, body);
}

#[tokio::test]
async fn unparseable_upstream_fails_without_affecting_later_requests() {
    let app = spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .up_to_n_times(1)
        .mount(&app.ssl_labs)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "READY" })))
        .mount(&app.ssl_labs)
        .await;

    let response = app.get(&grade_uri("example.com")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(!error.is_empty());

    let response = app.get(&grade_uri("example.com")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "READY");
}

#[tokio::test]
async fn unreachable_ssl_labs_fails_only_that_request() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let closed = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);

    let grader = SslLabsClient::new(&GradingConfig {
        base_url: closed,
        max_age_hours: None,
        timeout_secs: 5,
    })
    .unwrap();
    let router = build_router(AppState::new(
        Arc::new(MockRecognitionProvider::with_text("HELLO")),
        Arc::new(grader),
    ));

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(grade_uri("example.com"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(!error.is_empty());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(RECOGNIZE_PATH)
                .header("content-type", "application/json")
                .body(Body::from(json!({ "image": TINY_PNG_B64 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["text"], "HELLO");
}
