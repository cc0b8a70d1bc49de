pub mod auth;
pub mod config;
pub mod engine;
pub mod mcp;
pub mod pool;
pub mod routes;
pub mod search;
pub mod stdio_service;
pub mod tools;
pub mod types;

use anyhow::Context;
use config::Settings;
use engine::{Category, SearxngClient};
use pool::WorkerPool;
use search::SearchService;
use std::sync::Arc;
use tracing::info;

// Request, response and item models at the crate root
pub use types::*;

/// Everything a request handler needs, built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub search: SearchService,
    pub defaults: SearchOptions,
    pub api_keys: Vec<String>,
    pub api_prefix: String,
    pub enabled_tools: Vec<Category>,
    pub tool_max_results: u32,
}

impl AppState {
    pub fn new(search: SearchService, settings: &Settings) -> Self {
        Self {
            search,
            defaults: settings.default_search_options(),
            api_keys: settings.allowed_tokens(),
            api_prefix: settings.api_prefix.clone(),
            enabled_tools: settings.mcp_enable_tools.clone(),
            tool_max_results: settings.tool_max_results(),
        }
    }

    /// Start the worker pool, then build the blocking search client on it.
    pub async fn initialize(settings: &Settings) -> anyhow::Result<Self> {
        let pool = WorkerPool::new(settings.executor_max_workers)?;

        let url = settings.searxng_url.clone();
        let network = settings.network_options();
        let client = pool
            .submit(move || SearxngClient::new(&url, &network))
            .await?
            .context("Failed to create search backend client")?;

        let state = Self::new(SearchService::new(pool, Arc::new(client)), settings);
        info!(
            "Search backend ready: {} ({} workers)",
            settings.searxng_url,
            state.search.pool().capacity()
        );
        info!(
            "Authentication {}",
            if state.api_keys.is_empty() { "disabled" } else { "enabled" }
        );
        info!("Agent tools enabled: {:?}", state.enabled_tools);
        Ok(state)
    }

    /// Drain outstanding searches and stop the worker pool.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.search.pool().shutdown().await?;
        Ok(())
    }

    /// Shut down and release the state off the async threads; dropping the
    /// blocking HTTP client inside would stall them.
    pub async fn close(state: Arc<AppState>) -> anyhow::Result<()> {
        state.shutdown().await?;
        tokio::task::spawn_blocking(move || drop(state)).await?;
        Ok(())
    }
}
