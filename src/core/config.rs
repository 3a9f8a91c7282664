use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Retry/backoff knobs for the upstream market data client.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_multiplier: Duration,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub yahoo_base_url: String,
    pub yahoo_timeout: Duration,
    pub retry: RetryConfig,
    /// Default TTL attached to every search cache entry.
    pub cache_ttl: Duration,
    /// Directory for the on-disk cache; unset falls back to the platform
    /// data directory, and to the in-process cache if that is unavailable.
    pub cache_path: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source. Defaults:
    /// 8s timeout, 3 attempts, 0.8s backoff multiplier clamped to
    /// 0.5..4.0s, 1h cache TTL.
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = AppConfig {
            bind_addr: parse_or(&vars, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            yahoo_base_url: vars("YAHOO_BASE_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            yahoo_timeout: secs_or(&vars, "YAHOO_TIMEOUT_SECONDS", 8.0)?,
            retry: RetryConfig {
                max_attempts: parse_or(&vars, "YAHOO_RETRIES", 3)?,
                backoff_multiplier: secs_or(&vars, "YAHOO_BACKOFF_MULTIPLIER", 0.8)?,
                backoff_min: secs_or(&vars, "YAHOO_BACKOFF_MIN", 0.5)?,
                backoff_max: secs_or(&vars, "YAHOO_BACKOFF_MAX", 4.0)?,
            },
            cache_ttl: secs_or(&vars, "CACHE_TTL_SECONDS", 3600.0)?,
            cache_path: vars("CACHE_PATH").map(PathBuf::from),
        };
        debug!("Loaded config: {config:#?}");
        Ok(config)
    }
}

fn parse_or<T: FromStr>(
    vars: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match vars(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        None => Ok(default),
    }
}

fn secs_or(
    vars: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<Duration> {
    let secs = parse_or(vars, key, default)?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid duration for {key}: {secs}"))
}
