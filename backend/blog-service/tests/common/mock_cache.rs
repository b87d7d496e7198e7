//! Cache backend fakes: a counting wrapper over the in-process store, one
//! that always errors and one that never answers.

use super::Journal;
use async_trait::async_trait;
use blog_service::cache::{CacheError, CacheResult, CacheStore, InMemoryCacheStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct CountingCacheStore {
    inner: InMemoryCacheStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
    journal: Option<Journal>,
}

impl CountingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Raw stored value, bypassing the counters.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.unwrap_or(None)
    }

    pub async fn put_raw(&self, key: &str, value: &str, ttl: Duration) {
        let _ = self.inner.set(key, value, ttl).await;
    }

    fn record(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

#[async_trait]
impl CacheStore for CountingCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.record(format!("cache.set:{}", key));
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.record(format!("cache.delete:{}", key));
        self.inner.delete(key).await
    }
}

pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unavailable("connection reset by peer".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection reset by peer".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection reset by peer".into()))
    }
}

pub struct StalledCacheStore;

#[async_trait]
impl CacheStore for StalledCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        std::future::pending().await
    }
}
