use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo};
use std::time::Duration;
use tracing::info;

/// Redis connection handle shared by every request of a service.
///
/// `ConnectionManager` multiplexes commands over one connection and
/// reconnects on its own, so clones are cheap and need no extra locking.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    /// Connect to `redis_url`, giving up after `connect_timeout`.
    ///
    /// Accepts a bare `host:port` as well as `redis://` and `rediss://` URLs.
    pub async fn connect(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let normalized = normalize_redis_url(redis_url);
        let info = normalized
            .as_str()
            .into_connection_info()
            .context("failed to parse Redis connection string")?;

        let client = Client::open(info).context("failed to construct Redis client")?;

        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .with_context(|| format!("Redis connection timed out after {:?}", connect_timeout))?
            .context("failed to initialize Redis connection manager")?;

        info!("Redis connection manager ready");

        Ok(Self { manager })
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// Turn a bare `host:port` address into a `redis://` URL.
pub fn normalize_redis_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("redis://")
        || trimmed.starts_with("rediss://")
        || trimmed.starts_with("redis+unix://")
        || trimmed.starts_with("unix://")
    {
        trimmed.to_string()
    } else {
        format!("redis://{}", trimmed)
    }
}
