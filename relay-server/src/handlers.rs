use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use sr_core::domain::types::{RewriteBody, RewriteResponseBody};
use sr_core::infra::metrics::MetricsSummary;

use crate::error::ApiError;
use crate::AppState;

/// `POST /api/rewrite`
pub async fn rewrite(
    State(state): State<AppState>,
    body: Result<Json<RewriteBody>, JsonRejection>,
) -> Result<Json<RewriteResponseBody>, ApiError> {
    let Json(body) = body.map_err(|e| {
        log::warn!("リクエストボディを解釈できません: {e}");
        ApiError::Body(e.body_text())
    })?;

    let request = body.into_unvalidated_request();
    let rewritten_text = state
        .relay
        .rewrite(&request)
        .await
        .into_result()
        .map_err(ApiError::Rewrite)?;

    Ok(Json(RewriteResponseBody { rewritten_text }))
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub rewriter: String,
    pub credential_configured: bool,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        rewriter: state.relay.rewriter_name().to_string(),
        credential_configured: state.config.has_credential(),
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.relay.metrics().summary())
}
