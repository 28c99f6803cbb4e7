mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use sr_core::domain::error::AppError;
use sr_core::domain::settings::RelayConfig;
use sr_core::infra::rewriter::{OpenAiRewriter, Rewriter};
use sr_core::usecase::relay::RewriteRelay;

pub use error::{ApiError, ErrorBody};

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RewriteRelay>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(rewriter: Arc<dyn Rewriter>, config: RelayConfig) -> Self {
        Self {
            relay: Arc::new(RewriteRelay::new(rewriter)),
            config: Arc::new(config),
        }
    }

    /// 設定から OpenAI 互換プロバイダを組み立てる
    pub fn from_config(config: RelayConfig) -> Result<Self, AppError> {
        let rewriter = OpenAiRewriter::new(&config)?;
        log::info!(
            "プロバイダ: model={} url={}",
            rewriter.model(),
            config.provider_url
        );
        Ok(Self::new(Arc::new(rewriter), config))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/rewrite", post(handlers::rewrite))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// 待ち受けを開始し、Ctrl+C まで処理を続ける
pub async fn serve(config: RelayConfig) -> Result<(), AppError> {
    if !config.has_credential() {
        log::warn!("OPENAI_API_KEY が設定されていません。リライト要求はすべて失敗します");
    }

    let addr = config.listen_addr();
    let state = AppState::from_config(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::config(format!("{addr} で待ち受けできません: {e}")))?;
    log::info!("Style rewriter server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("サーバーが停止しました: {e}")))?;

    log::info!("サーバーを停止しました");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Ctrl+C を待機できません: {e}");
    }
}
