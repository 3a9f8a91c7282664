use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::Cache;

struct CacheValue {
    value: Value,
    expires_at: Instant,
}

/// In-process cache implementation using HashMap and an async Mutex.
pub struct MemoryCache {
    inner: Arc<Mutex<HashMap<String, CacheValue>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_json(&self, key: &str) -> Option<Value> {
        let mut cache = self.inner.lock().await;
        if let Some(entry) = cache.get(key) {
            if entry.expires_at < Instant::now() {
                debug!("Cache entry expired for key: {key}");
                cache.remove(key);
                return None;
            }
            debug!("Cache HIT for key: {key}");
            return Some(entry.value.clone());
        }
        debug!("Cache MISS for key: {key}");
        None
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) {
        let entry = CacheValue {
            value: value.clone(),
            expires_at: Instant::now() + ttl,
        };
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {key}");
        cache.insert(key.to_string(), entry);
    }

    async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let cache = self.inner.lock().await;
        let entry = cache.get(key)?;
        let remaining = entry.expires_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            None
        } else {
            Some(remaining)
        }
    }

    async fn delete(&self, key: &str) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
        debug!("Cache REMOVE for key: {key}");
    }
}
