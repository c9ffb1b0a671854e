use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use file_store::FileStore;
use filesync_server::{AppState, Cli, ServerConfig, banner, browser, create_router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli).context("failed to load server config")?;

    info!("starting filesync server");
    let store = FileStore::init(&config.storage_dir).await.with_context(|| {
        format!(
            "failed to create storage directory: {}",
            config.storage_dir.display()
        )
    })?;

    let state = Arc::new(AppState::new(store).with_max_upload_bytes(config.max_upload_bytes));
    let app = create_router(state);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let local_addr = listener.local_addr()?;
    banner::log_listening(&config.host, local_addr, &config.storage_dir);

    if config.open_browser {
        let url = config
            .browser_url
            .clone()
            .unwrap_or_else(|| browser::default_browser_url(&config.host, local_addr.port()));
        browser::spawn_browser(url);
    }

    info!("server is ready, press Ctrl+C to shut down");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping server");
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
