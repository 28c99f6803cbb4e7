//! 拡張機能のサービスワーカー相当。
//!
//! UI 側からの `{ action: "rewrite", payload }` メッセージを中継サーバーへの HTTP 呼び出しに
//! 変換し、`{ ok, data | status/statusText/body | error }` 形式で応答する。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::AppError;
use crate::domain::settings::BridgeConfig;
use crate::domain::types::{
    RewriteBody, RewriteRequest, RewriteResponseBody, StyleProfileBody, ORIGINAL_TEXT_REQUIRED,
};
use crate::infra::rewriter::{describe_transport_error, RewriteError, Rewriter};

/// 中継サーバーの応答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayReply {
    Ok(RewriteResponseBody),
    HttpError {
        status: u16,
        status_text: String,
        body: String,
    },
}

/// 中継サーバー（`POST /api/rewrite`）の HTTP クライアント
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("HTTP クライアント生成失敗: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// ボディをそのまま送信する。ネットワーク障害と不正な成功応答だけが `Err`。
    pub async fn send(&self, body: &RewriteBody) -> Result<RelayReply, RewriteError> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RewriteError::Timeout
                } else {
                    RewriteError::Transport(describe_transport_error(&e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(RelayReply::HttpError {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let parsed: RewriteResponseBody = response
            .json()
            .await
            .map_err(|e| {
                RewriteError::MalformedResponse(format!("Relay response parse error: {e}"))
            })?;
        Ok(RelayReply::Ok(parsed))
    }
}

#[async_trait]
impl Rewriter for RelayClient {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        request
            .validate()
            .map_err(|e| RewriteError::Validation(e.message))?;

        match self.send(&RewriteBody::from_request(request)).await? {
            RelayReply::Ok(body) => {
                let text = body.rewritten_text.trim();
                if text.is_empty() {
                    return Err(RewriteError::MalformedResponse(
                        "relay returned an empty rewritten_text".to_string(),
                    ));
                }
                Ok(text.to_string())
            }
            RelayReply::HttpError { status: 400, body, .. } => Err(RewriteError::Validation(body)),
            RelayReply::HttpError { status, body, .. } => {
                Err(RewriteError::Provider { status, body })
            }
        }
    }

    fn name(&self) -> &str {
        "relay"
    }
}

/// UI から届くメッセージ
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExtensionMessage {
    Rewrite {
        #[serde(default)]
        payload: RewriteBody,
    },
}

/// UI へ返す応答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RewriteResponseBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn success(data: RewriteResponseBody) -> Self {
        Self {
            ok: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn http_error(status: u16, status_text: String, body: String) -> Self {
        Self {
            ok: false,
            status: Some(status),
            status_text: Some(status_text),
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// メッセージブリッジ
pub struct ExtensionBridge {
    client: RelayClient,
    config: BridgeConfig,
}

impl ExtensionBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, AppError> {
        let client = RelayClient::new(config.relay_url.clone(), config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// 生の JSON メッセージを処理する。`rewrite` 以外のアクションは `None`（応答しない）。
    pub async fn handle_value(&self, message: serde_json::Value) -> Option<BridgeResponse> {
        if message.get("action").and_then(|a| a.as_str()) != Some("rewrite") {
            return None;
        }
        match serde_json::from_value::<ExtensionMessage>(message) {
            Ok(msg) => Some(self.handle(msg).await),
            Err(e) => Some(BridgeResponse::error(format!("invalid payload: {e}"))),
        }
    }

    pub async fn handle(&self, message: ExtensionMessage) -> BridgeResponse {
        let ExtensionMessage::Rewrite { payload } = message;
        let payload = self.with_default_style(payload);

        let blank = payload
            .original_text
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true);
        if blank {
            return BridgeResponse::error(ORIGINAL_TEXT_REQUIRED);
        }

        match self.client.send(&payload).await {
            Ok(RelayReply::Ok(data)) => BridgeResponse::success(data),
            Ok(RelayReply::HttpError {
                status,
                status_text,
                body,
            }) => BridgeResponse::http_error(status, status_text, body),
            Err(e) => {
                log::error!("service-worker fetch error: {e}");
                BridgeResponse::error(e.to_string())
            }
        }
    }

    /// スタイル指定がないペイロードには既定のスタイルを付与する
    fn with_default_style(&self, mut payload: RewriteBody) -> RewriteBody {
        if payload.style_profile.is_none() && payload.tone.is_none() {
            let profile = &self.config.style_profile;
            payload.style_profile = Some(StyleProfileBody {
                tone: Some(profile.tone.clone()),
                signature: profile.signature.clone(),
                custom_instructions: profile.custom_instructions.clone(),
            });
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StyleProfile;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bridge_for(server: &MockServer) -> ExtensionBridge {
        ExtensionBridge::new(BridgeConfig {
            relay_url: format!("{}/api/rewrite", server.uri()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_rewrite_message_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/rewrite"))
            .and(body_partial_json(serde_json::json!({
                "original_text": "hey",
                "style_profile": { "tone": "friendly but concise", "signature": "Best, Alex" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rewritten_text": "Hello!"
            })))
            .mount(&server)
            .await;

        let response = bridge_for(&server)
            .handle_value(serde_json::json!({
                "action": "rewrite",
                "payload": { "original_text": "hey" }
            }))
            .await
            .unwrap();

        assert!(response.ok);
        assert_eq!(response.data.unwrap().rewritten_text, "Hello!");
    }

    #[tokio::test]
    async fn test_http_error_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string("{\"error\":\"OpenAI error\"}"),
            )
            .mount(&server)
            .await;

        let response = bridge_for(&server)
            .handle_value(serde_json::json!({
                "action": "rewrite",
                "payload": { "original_text": "hey", "tone": "formal" }
            }))
            .await
            .unwrap();

        assert!(!response.ok);
        assert_eq!(response.status, Some(500));
        assert_eq!(response.status_text.as_deref(), Some("Internal Server Error"));
        assert!(response.body.unwrap().contains("OpenAI error"));

        let json =
            serde_json::to_value(BridgeResponse::http_error(500, "x".into(), "y".into())).unwrap();
        assert!(json.get("statusText").is_some());
    }

    #[tokio::test]
    async fn test_other_actions_are_ignored() {
        let server = MockServer::start().await;
        let bridge = bridge_for(&server);
        assert!(bridge.handle_value(serde_json::json!({ "action": "ping" })).await.is_none());
        assert!(bridge.handle_value(serde_json::json!({})).await.is_none());
    }

    #[tokio::test]
    async fn test_blank_text_never_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = bridge_for(&server)
            .handle_value(serde_json::json!({
                "action": "rewrite",
                "payload": { "original_text": "  " }
            }))
            .await
            .unwrap();
        assert_eq!(response.error.as_deref(), Some(ORIGINAL_TEXT_REQUIRED));
    }

    #[tokio::test]
    async fn test_unreachable_relay_reports_error() {
        let bridge = ExtensionBridge::new(BridgeConfig {
            relay_url: "http://127.0.0.1:9/api/rewrite".to_string(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();
        let response = bridge
            .handle_value(serde_json::json!({
                "action": "rewrite",
                "payload": { "original_text": "hey" }
            }))
            .await
            .unwrap();
        assert!(!response.ok);
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_relay_client_as_rewriter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rewritten_text": "  Dear Bob,\n"
            })))
            .mount(&server)
            .await;

        let client = RelayClient::new(format!("{}/api/rewrite", server.uri()), 5).unwrap();
        let request = RewriteRequest::new("hi bob", StyleProfile::with_tone("formal"));
        assert_eq!(client.rewrite(&request).await.unwrap(), "Dear Bob,");
    }

    #[tokio::test]
    async fn test_relay_client_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = RelayClient::new(format!("{}/api/rewrite", server.uri()), 5).unwrap();
        let request = RewriteRequest::new("hi", StyleProfile::default());
        let err = client.rewrite(&request).await.unwrap_err();
        assert_eq!(
            err,
            RewriteError::Provider {
                status: 502,
                body: "bad gateway".into()
            }
        );
    }
}
