use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::cache::Cache;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    value: Value,
    expires_at_unix: u64,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// fjall-backed cache. The keyspace is opened lazily on first use; any
/// backend or serialization failure degrades to cache-miss semantics
/// instead of reaching the caller.
pub struct DiskCache {
    path: PathBuf,
    backend: OnceLock<Option<(Keyspace, PartitionHandle)>>,
}

impl DiskCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            backend: OnceLock::new(),
        }
    }

    fn partition(&self) -> Option<&PartitionHandle> {
        self.backend
            .get_or_init(|| match open_backend(&self.path) {
                Ok(backend) => Some(backend),
                Err(e) => {
                    debug!("DiskCache unavailable at {}: {}", self.path.display(), e);
                    None
                }
            })
            .as_ref()
            .map(|(_, partition)| partition)
    }

    fn read_entry(&self, key: &str) -> Option<StoredEntry> {
        let partition = self.partition()?;
        let raw = match partition.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("DiskCache get error: {e}");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                // Corruption is a miss, never an error.
                debug!("DiskCache entry for {key} is corrupt: {e}");
                None
            }
        }
    }

    #[cfg(test)]
    fn insert_raw(&self, key: &str, bytes: &[u8]) {
        self.partition().unwrap().insert(key, bytes).unwrap();
    }
}

fn open_backend(path: &std::path::Path) -> anyhow::Result<(Keyspace, PartitionHandle)> {
    std::fs::create_dir_all(path)?;
    let keyspace = fjall::Config::new(path).open()?;
    let partition = keyspace.open_partition("cache", PartitionCreateOptions::default())?;
    Ok((keyspace, partition))
}

#[async_trait]
impl Cache for DiskCache {
    async fn get_json(&self, key: &str) -> Option<Value> {
        let entry = self.read_entry(key)?;
        if entry.expires_at_unix <= now_unix() {
            debug!("Cache entry expired for key: {key}");
            if let Some(partition) = self.partition() {
                if let Err(e) = partition.remove(key) {
                    debug!("DiskCache remove error: {e}");
                }
            }
            return None;
        }
        debug!("Cache HIT for key: {key}");
        Some(entry.value)
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) {
        let Some(partition) = self.partition() else {
            return;
        };
        let entry = StoredEntry {
            value: value.clone(),
            expires_at_unix: now_unix() + ttl.as_secs().max(1),
        };
        match serde_json::to_vec(&entry) {
            Ok(bytes) => {
                if let Err(e) = partition.insert(key, bytes) {
                    debug!("DiskCache put error: {e}");
                } else {
                    debug!("Cache PUT for key: {key}");
                }
            }
            Err(e) => debug!("DiskCache serialize error: {e}"),
        }
    }

    async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let entry = self.read_entry(key)?;
        let now = now_unix();
        if entry.expires_at_unix <= now {
            return None;
        }
        Some(Duration::from_secs(entry.expires_at_unix - now))
    }

    async fn delete(&self, key: &str) {
        if let Some(partition) = self.partition() {
            if let Err(e) = partition.remove(key) {
                debug!("DiskCache remove error: {e}");
            }
        }
    }
}
