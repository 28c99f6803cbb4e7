use sr_core::domain::settings::RelayConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env();
    log::info!(
        "起動設定: bind={} model={} max_tokens={} timeout={}s",
        config.listen_addr(),
        config.model,
        config.max_tokens,
        config.timeout_secs
    );

    if let Err(e) = relay_lib::serve(config).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
