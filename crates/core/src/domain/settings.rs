use serde::{Deserialize, Serialize};

use super::types::StyleProfile;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND_ADDR: &str = "SR_BIND_ADDR";
pub const ENV_MODEL: &str = "SR_MODEL";
pub const ENV_PROVIDER_URL: &str = "SR_PROVIDER_URL";
pub const ENV_MAX_TOKENS: &str = "SR_MAX_TOKENS";
pub const ENV_TIMEOUT_SECS: &str = "SR_TIMEOUT_SECS";
pub const ENV_LENGTH_TOLERANCE: &str = "SR_LENGTH_TOLERANCE_PCT";

/// 中継サーバー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// プロバイダの API キー（未設定なら起動時に警告し、呼び出し時に失敗する）
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// 待ち受けアドレス
    pub bind_addr: String,
    /// 待ち受けポート
    pub port: u16,
    /// モデル ID
    pub model: String,
    /// Chat Completions エンドポイント
    pub provider_url: String,
    /// 生成トークン上限
    pub max_tokens: u32,
    /// プロバイダ呼び出しのタイムアウト（秒）
    pub timeout_secs: u64,
    /// 原文に対する長さの許容幅（±%）
    pub length_tolerance_pct: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            model: "gpt-4o-mini".to_string(),
            provider_url: "https://api.openai.com/v1/chat/completions".to_string(),
            max_tokens: 800,
            timeout_secs: 30,
            length_tolerance_pct: 25,
        }
    }
}

impl RelayConfig {
    /// プロセス環境変数から読み込む
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のルックアップ関数から読み込む。数値が解釈できない場合はデフォルトに戻す。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: get(ENV_API_KEY),
            bind_addr: get(ENV_BIND_ADDR).unwrap_or(defaults.bind_addr),
            port: parse_or(ENV_PORT, get(ENV_PORT), defaults.port),
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            provider_url: get(ENV_PROVIDER_URL).unwrap_or(defaults.provider_url),
            max_tokens: parse_or(ENV_MAX_TOKENS, get(ENV_MAX_TOKENS), defaults.max_tokens),
            timeout_secs: parse_or(ENV_TIMEOUT_SECS, get(ENV_TIMEOUT_SECS), defaults.timeout_secs),
            length_tolerance_pct: parse_or(
                ENV_LENGTH_TOLERANCE,
                get(ENV_LENGTH_TOLERANCE),
                defaults.length_tolerance_pct,
            ),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            log::warn!("{key}={value} を解釈できません。デフォルト {default} を使用します");
            default
        }),
    }
}

/// 拡張機能側（サービスワーカー相当）の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 中継サーバーの URL
    pub relay_url: String,
    /// 既定のスタイルプロファイル
    pub style_profile: StyleProfile,
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:3000/api/rewrite".to_string(),
            style_profile: StyleProfile {
                tone: "friendly but concise".to_string(),
                signature: Some("Best, Alex".to_string()),
                custom_instructions: None,
            },
            timeout_secs: 60,
        }
    }
}
