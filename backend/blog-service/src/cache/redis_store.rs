use super::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use redis_utils::RedisPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Cache backend using Redis `GET` / `SET EX` / `DEL`
///
/// May start without a connection: until one is attached every call fails
/// with `CacheError::Unavailable`, which `PostCache` turns into a miss.
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: Arc<OnceCell<ConnectionManager>>,
}

impl RedisCacheStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis: Arc::new(OnceCell::new_with(Some(redis))),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            redis: Arc::new(OnceCell::new()),
        }
    }

    /// Connect once; on failure return a disconnected store and keep
    /// retrying every `retry_every` in the background.
    pub async fn connect_or_defer(
        url: &str,
        connect_timeout: Duration,
        retry_every: Duration,
    ) -> Self {
        match RedisPool::connect(url, connect_timeout).await {
            Ok(pool) => Self::new(pool.manager()),
            Err(e) => {
                warn!(error = %e, "Redis unavailable at startup; serving without cache");
                let store = Self::disconnected();
                store.spawn_reconnect(url.to_string(), connect_timeout, retry_every);
                store
            }
        }
    }

    fn spawn_reconnect(&self, url: String, connect_timeout: Duration, retry_every: Duration) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(retry_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match RedisPool::connect(&url, connect_timeout).await {
                    Ok(pool) => {
                        store.attach(pool.manager());
                        info!("Redis connected; cache enabled");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Redis reconnect attempt failed"),
                }
            }
        });
    }

    /// Install a connection; ignored if one is already present.
    pub fn attach(&self, redis: ConnectionManager) {
        let _ = self.redis.set(redis);
    }

    pub fn is_connected(&self) -> bool {
        self.redis.initialized()
    }

    fn conn(&self) -> CacheResult<ConnectionManager> {
        self.redis
            .get()
            .cloned()
            .ok_or_else(|| CacheError::Unavailable("Redis connection not established".to_string()))
    }

    /// Round-trip a `PING`, used by readiness probes.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn()?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!(
                "unexpected PING response: {}",
                pong
            )))
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn()?;
        let value = conn.get::<_, Option<String>>(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn()?;
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn()?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}
