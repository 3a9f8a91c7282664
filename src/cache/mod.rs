//! Cache-aside primitive: string keys, JSON payloads, mandatory TTL.

pub mod disk;
pub mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// JSON key-value cache with bounded staleness.
///
/// Absence covers both never-written keys and stored values that fail to
/// deserialize: corruption is a miss, never an error. Every write attaches
/// a TTL; there is no permanent entry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_json(&self, key: &str) -> Option<Value>;
    async fn set_json(&self, key: &str, value: &Value, ttl: Duration);
    /// Remaining lifetime of a live entry, `None` for absent or expired keys.
    async fn ttl_remaining(&self, key: &str) -> Option<Duration>;
    async fn delete(&self, key: &str);
}
