use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::domain::document::{ElementId, RegionDriver};
use crate::domain::error::AppError;
use crate::domain::settings::BridgeConfig;
use crate::domain::types::{RewriteRequest, StyleProfile};
use crate::infra::bridge::RelayClient;
use super::focus_resolver::FocusResolver;
use super::relay::RewriteRelay;
use super::text_replacer::{ReplaceError, ReplaceStrategy, TextReplacer};

/// 1 回のリライト操作の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// 作成欄に書き戻し、検証済み
    Replaced {
        strategy: ReplaceStrategy,
        rewritten_text: String,
    },
    /// クリップボードに渡した。利用者の貼り付けが必要。
    ClipboardHandoff { rewritten_text: String },
    /// どの手段でも渡せなかった。テキストを表示して手動コピーしてもらう。
    ManualCopy {
        rewritten_text: String,
        reason: String,
    },
}

/// 作成欄の解決 → 中継 → 書き戻し をまとめるユースケース
pub struct RewriteAction {
    relay: Arc<RewriteRelay>,
    replacer: TextReplacer,
}

impl RewriteAction {
    pub fn new(relay: Arc<RewriteRelay>, replacer: TextReplacer) -> Self {
        Self { relay, replacer }
    }

    /// 拡張機能側の構成: 中継サーバー経由でリライトし、失敗時はシステムクリップボードへ渡す
    pub fn from_bridge_config(config: &BridgeConfig) -> Result<Self, AppError> {
        let client = RelayClient::new(config.relay_url.clone(), config.timeout_secs)?;
        Ok(Self::new(
            Arc::new(RewriteRelay::new(Arc::new(client))),
            TextReplacer::with_system_clipboard(),
        ))
    }

    /// `scope` を指定すると、その作成ウィンドウ内だけで領域を解決する
    pub async fn run<D: RegionDriver + ?Sized>(
        &self,
        doc: &mut D,
        scope: Option<ElementId>,
        style: &StyleProfile,
    ) -> Result<ActionOutcome, AppError> {
        let region = match scope {
            Some(root) => FocusResolver::resolve_within(&*doc, root),
            None => FocusResolver::resolve(&*doc),
        }
        .ok_or_else(|| {
            AppError::resolution(
                "作成欄が見つかりません。下書きをクリックしてから再試行してください",
            )
        })?;

        let request = RewriteRequest::new(region.read(&*doc), style.clone());
        request
            .validate()
            .map_err(|_| AppError::validation("作成欄が空です。先に本文を入力してください"))?;

        let rewritten_text = self.relay.rewrite(&request).await.into_result()?;

        let start = Instant::now();
        let outcome = self.replacer.replace(doc, region, &rewritten_text);
        let metrics = self.relay.metrics();
        metrics.record_latency("replace", start.elapsed().as_millis() as u64);

        match outcome {
            Ok(outcome) if outcome.needs_manual_paste() => {
                metrics.inc_clipboard_handoffs();
                Ok(ActionOutcome::ClipboardHandoff { rewritten_text })
            }
            Ok(outcome) => {
                metrics.inc_replacements_verified();
                Ok(ActionOutcome::Replaced {
                    strategy: outcome.strategy,
                    rewritten_text,
                })
            }
            Err(ReplaceError::TotalFailure { text, reason }) => Ok(ActionOutcome::ManualCopy {
                rewritten_text: text,
                reason,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
