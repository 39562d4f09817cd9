// Credit Registry - Credit Service
// REST API for credit applications, backed by SQLite and gated by the
// client directory

use anyhow::{Context, Result};
use std::sync::Arc;

use credit_registry::{
    credit_app, logging, CreditLifecycle, CreditStore, HttpClientVerifier, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = ServiceConfig::from_env()?;

    let store = CreditStore::open(&config.credit_db_path)
        .with_context(|| format!("failed to open {}", config.credit_db_path.display()))?;
    tracing::info!(path = %config.credit_db_path.display(), "credit database opened");

    let verifier = HttpClientVerifier::new(&config.directory_url, config.verify_timeout)
        .context("failed to build client directory HTTP client")?;
    tracing::info!(
        directory = %config.directory_url,
        timeout_ms = config.verify_timeout.as_millis() as u64,
        "client verification configured"
    );

    let lifecycle = CreditLifecycle::new(store, Arc::new(verifier));
    let app = credit_app(lifecycle, &config);

    let listener = tokio::net::TcpListener::bind(&config.credit_bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.credit_bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = config.environment.as_str(),
        "credit service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("credit service stopped with an error")?;

    tracing::info!("credit service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
