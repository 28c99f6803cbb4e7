use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::domain::types::{RewriteRequest, RewriteResult};
use super::relay::RewriteRelay;

/// 非同期リライトの発行器。
///
/// 発行ごとに単調増加するトークンを振り、後から発行されたリクエストがあれば
/// 古い応答は `Superseded` として返す（連打時は最後に発行したものが勝つ）。
pub struct RewriteDispatcher {
    relay: Arc<RewriteRelay>,
    latest: Arc<AtomicU64>,
}

/// 完了待ち用のチケット
pub struct RewriteTicket {
    token: u64,
    latest: Arc<AtomicU64>,
    result_rx: oneshot::Receiver<RewriteResult>,
    handle: JoinHandle<()>,
}

/// チケットの最終状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(RewriteResult),
    /// より新しいリクエストが発行済み。応答は破棄する。
    Superseded { token: u64, latest: u64 },
    Canceled,
}

impl RewriteDispatcher {
    pub fn new(relay: Arc<RewriteRelay>) -> Self {
        Self {
            relay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// リライトをタスクとして発行する
    pub fn dispatch(&self, request: RewriteRequest) -> RewriteTicket {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let (result_tx, result_rx) = oneshot::channel();
        let relay = Arc::clone(&self.relay);

        let handle = tokio::spawn(async move {
            let result = relay.rewrite(&request).await;
            // 受信側が破棄済みでも問題ない
            let _ = result_tx.send(result);
        });

        log::debug!("リライト発行: token={token}");

        RewriteTicket {
            token,
            latest: Arc::clone(&self.latest),
            result_rx,
            handle,
        }
    }

    pub fn latest_token(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

impl RewriteTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.token
    }

    /// 実行中のタスクを中断する
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub async fn wait(self) -> DispatchOutcome {
        let Self {
            token,
            latest,
            result_rx,
            ..
        } = self;

        match result_rx.await {
            Ok(result) => {
                let latest = latest.load(Ordering::SeqCst);
                if latest != token {
                    log::debug!("古い応答を破棄: token={token} latest={latest}");
                    DispatchOutcome::Superseded { token, latest }
                } else {
                    DispatchOutcome::Completed(result)
                }
            }
            Err(_) => DispatchOutcome::Canceled,
        }
    }
}
