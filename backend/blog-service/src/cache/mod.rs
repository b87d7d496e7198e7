/// Cache layer
///
/// - `CacheStore`: string key/value store with per-entry expiry
/// - `RedisCacheStore` / `InMemoryCacheStore`: the two backends
/// - `PostCache`: cache-aside for post snapshots, degrading on every failure
pub mod memory;
pub mod post_cache;
pub mod redis_store;

pub use memory::InMemoryCacheStore;
pub use post_cache::PostCache;
pub use redis_store::RedisCacheStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Lifetime of a post snapshot, counted from the write. Not sliding.
pub const POST_TTL: Duration = Duration::from_secs(300);

/// Cache key for a post snapshot.
/// Format: post:{id}
pub fn post_key(id: i64) -> String {
    format!("post:{}", id)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// A miss is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Overwrite `key` and restart its expiry at `now + ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`; absent keys are not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
