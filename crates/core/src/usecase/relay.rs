use std::sync::Arc;
use std::time::Instant;

use crate::domain::types::{FailureKind, RewriteFailure, RewriteRequest, RewriteResult};
use crate::infra::metrics::Metrics;
use crate::infra::rewriter::Rewriter;

/// リライト中継: 入力検証、プロバイダ呼び出し、結果の構造化を担う。
/// 失敗はすべて `RewriteResult::Failure` として返し、呼び出し側へ伝播させない。
pub struct RewriteRelay {
    rewriter: Arc<dyn Rewriter>,
    metrics: Arc<Metrics>,
}

impl RewriteRelay {
    pub fn new(rewriter: Arc<dyn Rewriter>) -> Self {
        Self::with_metrics(rewriter, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(rewriter: Arc<dyn Rewriter>, metrics: Arc<Metrics>) -> Self {
        Self { rewriter, metrics }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn rewriter_name(&self) -> &str {
        self.rewriter.name()
    }

    pub async fn rewrite(&self, request: &RewriteRequest) -> RewriteResult {
        self.metrics.inc_requests();

        if let Err(e) = request.validate() {
            return self.fail(RewriteFailure {
                kind: FailureKind::ValidationError,
                detail: e.message,
                status: None,
            });
        }

        let request_id = uuid::Uuid::new_v4();
        log::info!(
            "リライト開始 [{request_id}] rewriter={} tone={:?} chars={}",
            self.rewriter.name(),
            request.style_profile.tone,
            request.original_text.chars().count()
        );

        let start = Instant::now();
        let outcome = self.rewriter.rewrite(request).await;
        self.metrics
            .record_latency("rewrite", start.elapsed().as_millis() as u64);

        match outcome {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return self.fail(RewriteFailure {
                        kind: FailureKind::MalformedResponse,
                        detail: "provider returned empty text".to_string(),
                        status: None,
                    });
                }
                self.metrics.inc_rewrites_succeeded();
                log::info!(
                    "リライト完了 [{request_id}] chars={}",
                    text.chars().count()
                );
                RewriteResult::Success {
                    rewritten_text: text.to_string(),
                }
            }
            Err(e) => {
                log::warn!("リライト失敗 [{request_id}]: {e}");
                self.fail(e.into_failure())
            }
        }
    }

    fn fail(&self, failure: RewriteFailure) -> RewriteResult {
        self.metrics.inc_failure(failure.kind);
        RewriteResult::Failure(failure)
    }
}
