//! Biomedical Search Aggregator — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use biosearch_aggregator::api::{self, AppState};
use biosearch_aggregator::config::AppConfig;
use biosearch_aggregator::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("biosearch_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::load_default()?;
    let bind_addr = config.bind_addr.clone();

    let metrics = Metrics::init();
    let state = AppState::new(config);
    let router = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "biosearch aggregator listening");
    axum::serve(listener, router).await?;

    Ok(())
}
