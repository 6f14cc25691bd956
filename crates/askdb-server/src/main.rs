use anyhow::Context;
use askdb_server::config::{load_config, Args};
use askdb_server::{router, AppState};
use clap::Parser;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing_subscriber::EnvFilter;

/// How long live sessions get to say goodbye after shutdown starts.
const SESSION_DRAIN: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let bind = config.server.bind.clone();
    let state = AppState::from_config(config)?;
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(bind = %bind, "askdb-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    // Upgraded connections outlive the HTTP server; wait for their teardown.
    let deadline = Instant::now() + SESSION_DRAIN;
    while !state.registry.is_empty() && Instant::now() < deadline {
        sleep(Duration::from_millis(50)).await;
    }

    tracing::info!(remaining = state.registry.len(), "askdb-server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!(sessions = state.registry.len(), "shutdown signal received");
    state.close_sessions();
}
