use serde::{Deserialize, Serialize};

use super::error::AppError;

/// トーン未指定時のデフォルト
pub const DEFAULT_TONE: &str = "friendly but concise";

/// 空の原文に対するエラーメッセージ（ワイヤ上の 400 応答と共通）
pub const ORIGINAL_TEXT_REQUIRED: &str = "original_text required";

/// スタイルプロファイル（リクエストごとに渡される不変値）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub tone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl StyleProfile {
    pub fn with_tone(tone: impl Into<String>) -> Self {
        Self {
            tone: tone.into(),
            ..Default::default()
        }
    }
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            tone: DEFAULT_TONE.to_string(),
            signature: None,
            custom_instructions: None,
        }
    }
}

/// リライトリクエスト（ユーザー操作ごとに生成、永続化しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub original_text: String,
    pub style_profile: StyleProfile,
}

impl RewriteRequest {
    pub fn new(original_text: impl Into<String>, style_profile: StyleProfile) -> Self {
        Self {
            original_text: original_text.into(),
            style_profile,
        }
    }

    /// 原文が空白のみなら拒否する。ネットワーク呼び出しの前に必ず通す。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.original_text.trim().is_empty() {
            return Err(AppError::validation(ORIGINAL_TEXT_REQUIRED));
        }
        Ok(())
    }
}

/// 失敗種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ValidationError,
    ProviderError,
    MalformedResponse,
    TransportError,
}

/// リライト失敗の詳細
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteFailure {
    pub kind: FailureKind,
    pub detail: String,
    /// プロバイダ（または中継サーバー）が返した HTTP ステータス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// リライト結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RewriteResult {
    Success { rewritten_text: String },
    Failure(RewriteFailure),
}

impl RewriteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn into_result(self) -> Result<String, RewriteFailure> {
        match self {
            Self::Success { rewritten_text } => Ok(rewritten_text),
            Self::Failure(failure) => Err(failure),
        }
    }
}

/// `POST /api/rewrite` のリクエストボディ。
///
/// 2 つの形が共存している:
/// - `{ original_text, style_profile: { tone, signature, custom_instructions } }`
/// - `{ original_text, tone, user_instructions }`
///
/// 正規化規則: ネストした `style_profile` の値が優先し、空か欠落しているときだけ
/// フラットな `tone` / `user_instructions` で補う。`signature` はネスト形にしか存在しない。
/// 空白のみの文字列は欠落として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_profile: Option<StyleProfileBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_instructions: Option<String>,
}

/// ネスト形の `style_profile`（全フィールド省略可）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfileBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl RewriteBody {
    /// どちらの形でも同じ `StyleProfile` に正規化する
    pub fn style_profile(&self) -> StyleProfile {
        let nested = self.style_profile.as_ref();

        let tone = nested
            .and_then(|p| non_blank(p.tone.as_deref()))
            .or_else(|| non_blank(self.tone.as_deref()))
            .unwrap_or(DEFAULT_TONE);
        let signature = nested.and_then(|p| non_blank(p.signature.as_deref()));
        let custom_instructions = nested
            .and_then(|p| non_blank(p.custom_instructions.as_deref()))
            .or_else(|| non_blank(self.user_instructions.as_deref()));

        StyleProfile {
            tone: tone.to_string(),
            signature: signature.map(str::to_string),
            custom_instructions: custom_instructions.map(str::to_string),
        }
    }

    /// ボディを検証済みの `RewriteRequest` に変換する
    pub fn into_request(self) -> Result<RewriteRequest, AppError> {
        let request = self.into_unvalidated_request();
        request.validate()?;
        Ok(request)
    }

    /// 正規化だけ行う。検証は `RewriteRelay::rewrite` に任せる。
    pub fn into_unvalidated_request(self) -> RewriteRequest {
        let style_profile = self.style_profile();
        RewriteRequest::new(self.original_text.unwrap_or_default(), style_profile)
    }

    /// 送信側はネスト形だけを使う
    pub fn from_request(request: &RewriteRequest) -> Self {
        let profile = &request.style_profile;
        Self {
            original_text: Some(request.original_text.clone()),
            style_profile: Some(StyleProfileBody {
                tone: Some(profile.tone.clone()),
                signature: profile.signature.clone(),
                custom_instructions: profile.custom_instructions.clone(),
            }),
            tone: None,
            user_instructions: None,
        }
    }
}

/// `POST /api/rewrite` の成功レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResponseBody {
    pub rewritten_text: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_whitespace() {
        let req = RewriteRequest::new("  \n\t ", StyleProfile::default());
        let err = req.validate().unwrap_err();
        assert_eq!(err.message, ORIGINAL_TEXT_REQUIRED);
    }

    #[test]
    fn test_nested_shape_wins_over_flat() {
        let body: RewriteBody = serde_json::from_value(serde_json::json!({
            "original_text": "Hello",
            "style_profile": { "tone": "formal", "signature": "Best, Alex" },
            "tone": "casual",
            "user_instructions": "shorten it"
        }))
        .unwrap();

        let profile = body.style_profile();
        assert_eq!(profile.tone, "formal");
        assert_eq!(profile.signature.as_deref(), Some("Best, Alex"));
        assert_eq!(profile.custom_instructions.as_deref(), Some("shorten it"));
    }

    #[test]
    fn test_flat_shape_fills_missing_nested_fields() {
        let body: RewriteBody = serde_json::from_value(serde_json::json!({
            "original_text": "Hello",
            "style_profile": { "tone": "   " },
            "tone": "casual"
        }))
        .unwrap();
        assert_eq!(body.style_profile().tone, "casual");
    }

    #[test]
    fn test_missing_tone_uses_default() {
        let body = RewriteBody {
            original_text: Some("Hello".into()),
            ..Default::default()
        };
        assert_eq!(body.style_profile(), StyleProfile::default());
    }

    #[test]
    fn test_into_request_requires_original_text() {
        let err = RewriteBody::default().into_request().unwrap_err();
        assert_eq!(err.message, ORIGINAL_TEXT_REQUIRED);
    }

    #[test]
    fn test_from_request_uses_nested_shape() {
        let req = RewriteRequest::new("Hello", StyleProfile::with_tone("formal"));
        let body = RewriteBody::from_request(&req);
        assert!(body.tone.is_none());
        assert_eq!(body.into_request().unwrap(), req);
    }

    #[test]
    fn test_rewrite_result_into_result() {
        let ok = RewriteResult::Success {
            rewritten_text: "Hi".into(),
        };
        assert_eq!(ok.into_result().unwrap(), "Hi");

        let failure = RewriteResult::Failure(RewriteFailure {
            kind: FailureKind::TransportError,
            detail: "connection refused".into(),
            status: None,
        });
        assert!(!failure.is_success());
        assert_eq!(failure.into_result().unwrap_err().kind, FailureKind::TransportError);
    }
}
