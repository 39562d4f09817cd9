// Credit Registry - Client Directory
// Service of record for customers; the credit service verifies against it

use anyhow::{Context, Result};

use credit_registry::{directory_app, logging, CustomerDirectory, CustomerStore, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = ServiceConfig::from_env()?;

    let store = CustomerStore::open(&config.directory_db_path)
        .with_context(|| format!("failed to open {}", config.directory_db_path.display()))?;
    tracing::info!(path = %config.directory_db_path.display(), "customer database opened");

    let app = directory_app(CustomerDirectory::new(store), &config);

    let listener = tokio::net::TcpListener::bind(&config.directory_bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.directory_bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = config.environment.as_str(),
        "client directory listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
        .context("client directory stopped with an error")?;

    tracing::info!("client directory stopped");
    Ok(())
}
