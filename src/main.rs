use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use search_api::{config::Settings, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::parse();

    info!("Starting Search API");
    info!("SearXNG URL: {}", settings.searxng_url);

    let state = Arc::new(AppState::initialize(&settings).await?);
    let app = routes::router(state.clone());

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(
        "Search API listening on http://{}{}",
        settings.bind, settings.api_prefix
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining in-flight searches");
    AppState::close(state).await?;
    info!("Search API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
