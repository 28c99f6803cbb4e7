use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_PROVIDER")]
    Provider,
    #[serde(rename = "E_MALFORMED_RESPONSE")]
    MalformedResponse,
    #[serde(rename = "E_TRANSPORT")]
    Transport,
    #[serde(rename = "E_REPLACEMENT")]
    Replacement,
    #[serde(rename = "E_RESOLUTION")]
    Resolution,
    #[serde(rename = "E_CONFIG")]
    Config,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "E_VALIDATION",
            Self::Provider => "E_PROVIDER",
            Self::MalformedResponse => "E_MALFORMED_RESPONSE",
            Self::Transport => "E_TRANSPORT",
            Self::Replacement => "E_REPLACEMENT",
            Self::Resolution => "E_RESOLUTION",
            Self::Config => "E_CONFIG",
            Self::Internal => "E_INTERNAL",
        }
    }
}

/// アプリケーションエラー（呼び出し側に返す構造化エラー）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Resolution,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn replacement(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Replacement,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Config,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<super::types::RewriteFailure> for AppError {
    fn from(failure: super::types::RewriteFailure) -> Self {
        use super::types::FailureKind;

        let code = match failure.kind {
            FailureKind::ValidationError => ErrorCode::Validation,
            FailureKind::ProviderError => ErrorCode::Provider,
            FailureKind::MalformedResponse => ErrorCode::MalformedResponse,
            FailureKind::TransportError => ErrorCode::Transport,
        };
        let message = match failure.status {
            Some(status) => format!("{status} {}", failure.detail),
            None => failure.detail,
        };
        Self {
            code,
            message,
            recoverable: true,
        }
    }
}
