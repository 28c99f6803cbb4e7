use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompts;
use super::{describe_transport_error, RewriteError, Rewriter};
use crate::domain::error::AppError;
use crate::domain::settings::RelayConfig;
use crate::domain::types::RewriteRequest;

/// OpenAI Chat Completions API を使用したリライター
pub struct OpenAiRewriter {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
    length_tolerance_pct: u8,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiRewriter {
    pub fn new(config: &RelayConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("HTTP クライアント生成失敗: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.provider_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            length_tolerance_pct: config.length_tolerance_pct,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Rewriter for OpenAiRewriter {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        request
            .validate()
            .map_err(|e| RewriteError::Validation(e.message))?;

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RewriteError::NotConfigured("OPENAI_API_KEY is not set".to_string())
        })?;

        let user_msg = prompts::build_prompt(
            &request.original_text,
            &request.style_profile,
            self.length_tolerance_pct,
        );

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: prompts::SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &user_msg,
                },
            ],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
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
            log::error!("OpenAI API error: {status} - {body}");
            return Err(RewriteError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RewriteError::Timeout
            } else {
                RewriteError::Transport(describe_transport_error(&e))
            }
        })?;

        let parsed: ChatResponse = serde_json::from_str(&raw)
            .map_err(|e| RewriteError::MalformedResponse(format!("Response parse error: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RewriteError::MalformedResponse(
                "choices[0].message.content is missing or empty".to_string(),
            ));
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
