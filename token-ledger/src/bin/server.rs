//! Ledger server binary
//!
//! Transport is supplied by the embedding deployment; this binary hosts the
//! engine, seeds it from configuration and serves until interrupted.

use anyhow::Context;
use token_ledger::{Config, Ledger};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting token ledger server");

    let ledger = Ledger::open(config).await.context("Failed to open ledger")?;
    tracing::info!(tokens = ledger.token_ids().len(), "Ledger opened successfully");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down ledger server");
    let snapshot = ledger.shutdown_with_snapshot().await?;
    tracing::info!(tokens = snapshot.tokens.len(), "Final state captured");

    if let Some(path) = std::env::var_os("LEDGER_SNAPSHOT_PATH") {
        std::fs::write(&path, snapshot.to_json()?)
            .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
        tracing::info!("Wrote final snapshot to {:?}", path);
    }

    Ok(())
}
