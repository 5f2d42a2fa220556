//! Research API server binary.
//!
//! Loads `.env`, configuration, and API keys, then serves the research API
//! until interrupted. Logs go to stderr, filtered by `RUST_LOG`.

use std::sync::Arc;

use ac_research::{ResearchConfig, ResearchServer, ResearchService};
use ac_search::SystemClock;
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let config = ResearchConfig::load().context("failed to load configuration")?;
    tracing::info!(
        keys = ?config.sources.keys,
        production = config.server.production,
        "ac-research starting"
    );

    let service = Arc::new(
        ResearchService::new(&config, Arc::new(SystemClock))
            .context("failed to build research service")?,
    );
    let server = ResearchServer::start(service, &config.server)
        .await
        .context("failed to start research API")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!(addr = %server.addr(), "ac-research shutting down");
    server.shutdown();
    Ok(())
}
