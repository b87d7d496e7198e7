//! In-process cache backend.
//!
//! Entries carry an absolute expiry instant. An expired entry is dropped on
//! the first read after it, and writes sweep the whole map at most once per
//! `SWEEP_INTERVAL` so snapshots nobody reads again are still released. Uses
//! tokio's clock so paused-time tests can step over the TTL.

use super::{CacheResult, CacheStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between write-triggered sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    value: String,
    expires_at: Instant,
}

pub struct InMemoryCacheStore {
    entries: Arc<DashMap<String, Entry>>,
    next_sweep: Mutex<Instant>,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            next_sweep: Mutex::new(Instant::now() + SWEEP_INTERVAL),
        }
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries, Instant::now())
    }

    /// Purge on a fixed period even when nothing is written. Stops once the
    /// store is dropped.
    pub fn spawn_sweeper(&self, every: Duration) {
        let entries = Arc::downgrade(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match entries.upgrade() {
                    Some(entries) => {
                        purge(&entries, Instant::now());
                    }
                    None => break,
                }
            }
        });
    }

    fn sweep_if_due(&self, now: Instant) {
        let due = match self.next_sweep.lock() {
            Ok(mut next) if *next <= now => {
                *next = now + SWEEP_INTERVAL;
                true
            }
            _ => false,
        };
        if due {
            purge(&self.entries, now);
        }
    }
}

fn purge(entries: &DashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    let removed = before.saturating_sub(entries.len());
    if removed > 0 {
        debug!(removed, remaining = entries.len(), "purged expired cache entries");
    }
    removed
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        self.sweep_if_due(now);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::POST_TTL;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = InMemoryCacheStore::new();
        store.set("post:1", "snapshot", POST_TTL).await.unwrap();

        tokio::time::advance(POST_TTL - Duration::from_millis(1)).await;
        assert_eq!(store.get("post:1").await.unwrap().as_deref(), Some("snapshot"));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(store.get("post:1").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_restarts_expiry() {
        let store = InMemoryCacheStore::new();
        store.set("post:1", "v1", POST_TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        store.set("post:1", "v2", POST_TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(store.get("post:1").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_releases_unread_expired_entries() {
        let store = InMemoryCacheStore::new();
        for id in 0..50 {
            store
                .set(&crate::cache::post_key(id), "snapshot", POST_TTL)
                .await
                .unwrap();
        }
        assert_eq!(store.len(), 50);

        tokio::time::advance(POST_TTL + Duration::from_secs(1)).await;
        store.set("post:999", "fresh", POST_TTL).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("post:999").await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_keeps_live_entries() {
        let store = InMemoryCacheStore::new();
        store.set("post:1", "old", Duration::from_secs(10)).await.unwrap();
        store.set("post:2", "live", POST_TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("post:2").await.unwrap().as_deref(), Some("live"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_without_writes() {
        let store = InMemoryCacheStore::new();
        store.set("post:1", "v", Duration::from_secs(5)).await.unwrap();
        store.spawn_sweeper(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryCacheStore::new();
        store.set("post:1", "v", POST_TTL).await.unwrap();

        store.delete("post:1").await.unwrap();
        store.delete("post:1").await.unwrap();
        store.delete("post:404").await.unwrap();

        assert_eq!(store.get("post:1").await.unwrap(), None);
    }
}
