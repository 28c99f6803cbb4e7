mod noop;
pub mod openai;
pub mod prompts;

pub use noop::NoopRewriter;
pub use openai::OpenAiRewriter;

use async_trait::async_trait;

use crate::domain::types::{FailureKind, RewriteFailure, RewriteRequest};

/// リライトエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Provider error {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rewrite timeout")]
    Timeout,
}

impl RewriteError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::ValidationError,
            Self::NotConfigured(_) | Self::Provider { .. } => FailureKind::ProviderError,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::Transport(_) | Self::Timeout => FailureKind::TransportError,
        }
    }

    /// 構造化された失敗に変換する。プロバイダエラーの detail は応答本文そのもの。
    pub fn into_failure(self) -> RewriteFailure {
        let kind = self.kind();
        let (detail, status) = match self {
            Self::Provider { status, body } => (body, Some(status)),
            Self::Timeout => ("request timed out".to_string(), None),
            Self::Validation(msg)
            | Self::NotConfigured(msg)
            | Self::MalformedResponse(msg)
            | Self::Transport(msg) => (msg, None),
        };
        RewriteFailure { kind, detail, status }
    }
}

/// リライター trait（生成プロバイダや中継サーバーが実装する）
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError>;

    fn name(&self) -> &str;
}

/// reqwest のエラーを原因の連鎖まで含めて文字列化する
pub(crate) fn describe_transport_error(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
