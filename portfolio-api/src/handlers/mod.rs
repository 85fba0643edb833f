//! HTTP handlers for portfolio-api.

pub mod health;
pub mod recognize;
pub mod ssl_grade;

pub use health::{health_check, metrics, readiness_check};
pub use recognize::{method_not_allowed, recognize_handwriting};
pub use ssl_grade::ssl_grade;
