use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS: the endpoints are called from the public site and from
/// local dev servers on arbitrary ports.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
