use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde_json::Value;
use service_core::error::AppError;

use crate::models::GradeQuery;
use crate::services::metrics::record_ssl_grade;
use crate::services::{check_host, HostCheck};
use crate::startup::AppState;

#[tracing::instrument(skip(state, query))]
pub async fn ssl_grade(
    State(state): State<AppState>,
    query: Result<Query<GradeQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) =
        query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let host = match check_host(query.host.as_deref()) {
        HostCheck::Public(host) => host,
        HostCheck::Missing => {
            record_ssl_grade("rejected");
            return Err(AppError::bad_request("Missing host parameter"));
        }
        HostCheck::NotPublic => {
            tracing::warn!(host = ?query.host, "Refusing to grade non-public host");
            record_ssl_grade("rejected");
            return Err(AppError::bad_request("SSL Labs only supports public domains."));
        }
        HostCheck::Invalid => {
            record_ssl_grade("rejected");
            return Err(AppError::bad_request("Invalid host parameter"));
        }
    };

    match state.grader.analyze(&host).await {
        Ok(report) => {
            record_ssl_grade("relayed");
            Ok(Json(report))
        }
        Err(e) => {
            tracing::error!(host = %host, error = %e, "SSL Labs request failed");
            record_ssl_grade("failed");
            Err(AppError::Upstream(e.to_string()))
        }
    }
}
