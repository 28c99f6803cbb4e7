use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use sr_core::domain::error::{AppError, ErrorCode};
use sr_core::domain::types::{FailureKind, RewriteFailure};

/// ハンドラのエラー型（axum のレスポンスに変換される）
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("{:?}: {}", .0.kind, .0.detail)]
    Rewrite(RewriteFailure),
    #[error("invalid request body: {0}")]
    Body(String),
}

/// エラー応答ボディ `{ error, details? }`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}

/// 失敗種別ごとの `error` ラベル
pub fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::ValidationError => "Validation error",
        FailureKind::ProviderError => "Provider error",
        FailureKind::MalformedResponse => "Malformed provider response",
        FailureKind::TransportError => "Server error",
    }
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            Self::App(e) if e.code == ErrorCode::Validation => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(e.message, None))
            }
            Self::App(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Server error", Some(e.message)),
            ),
            Self::Rewrite(f) if f.kind == FailureKind::ValidationError => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(f.detail, None))
            }
            Self::Rewrite(f) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(failure_label(f.kind), Some(f.detail)),
            ),
            Self::Body(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("invalid request body", Some(reason)),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
