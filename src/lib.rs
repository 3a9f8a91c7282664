pub mod api;
pub mod cache;
pub mod core;
pub mod ledger;
pub mod providers;
pub mod search;
pub mod store;

use anyhow::Result;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::AppState;
use crate::cache::{Cache, DiskCache, MemoryCache};
use crate::core::AppConfig;
use crate::providers::retry::RetryPolicy;
use crate::providers::yahoo::YahooClient;
use crate::search::AssetSearch;
use crate::store::Store;

/// Builds the process-wide state: one upstream client, one cache handle,
/// one store, all threaded through the router via `AppState`.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let policy = RetryPolicy::from(&config.retry);
    let market = Arc::new(YahooClient::new(
        &config.yahoo_base_url,
        config.yahoo_timeout,
        policy,
    )?);
    let cache = build_cache(config);
    let search = Arc::new(AssetSearch::new(market.clone(), cache, config.cache_ttl));
    Ok(AppState::new(Store::new(), search, market))
}

fn build_cache(config: &AppConfig) -> Arc<dyn Cache> {
    let path = config.cache_path.clone().or_else(default_cache_dir);
    match path {
        Some(path) => {
            info!("Using disk cache at {}", path.display());
            Arc::new(DiskCache::new(path))
        }
        None => {
            warn!("No cache directory available, falling back to in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}

fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "invest-api", "invest-api")
        .map(|dirs| dirs.data_dir().join("cache"))
}

pub async fn run() -> Result<()> {
    info!("Invest API starting...");

    let config = AppConfig::from_env()?;
    let state = build_state(&config)?;
    let app = api::create_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the state here releases the upstream connection pool and
    // the cache keyspace.
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
}
