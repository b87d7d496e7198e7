//! In-memory gateway fakes shared by the integration tests.
//!
//! Every fake can record what it was asked to do into a shared `Journal`, so
//! tests can assert on cross-gateway ordering.
#![allow(dead_code)]

pub mod mock_cache;
pub mod mock_index;
pub mod mock_store;

use blog_service::cache::{CacheStore, PostCache};
use blog_service::db::PostStore;
use blog_service::search::SearchIndex;
use blog_service::services::PostService;
use blog_service::timeout::BackendTimeouts;
use std::sync::{Arc, Mutex};

pub use mock_cache::{CountingCacheStore, FailingCacheStore, StalledCacheStore};
pub use mock_index::RecordingSearchIndex;
pub use mock_store::InMemoryPostStore;

/// Ordered record of gateway calls across fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Short budgets so failure paths finish quickly under real time.
pub fn test_timeouts() -> BackendTimeouts {
    BackendTimeouts {
        store: std::time::Duration::from_millis(500),
        cache: std::time::Duration::from_millis(100),
        index: std::time::Duration::from_millis(300),
    }
}

pub fn build_service(
    store: Arc<dyn PostStore>,
    cache: Arc<dyn CacheStore>,
    index: Arc<dyn SearchIndex>,
) -> PostService {
    let timeouts = test_timeouts();
    PostService::new(store, PostCache::new(cache, timeouts.cache), index, timeouts)
}

/// Service wired to healthy fakes that share one journal.
pub struct Harness {
    pub store: Arc<InMemoryPostStore>,
    pub cache: Arc<CountingCacheStore>,
    pub index: Arc<RecordingSearchIndex>,
    pub journal: Journal,
    pub service: PostService,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        let store = Arc::new(InMemoryPostStore::with_journal(journal.clone()));
        let cache = Arc::new(CountingCacheStore::with_journal(journal.clone()));
        let index = Arc::new(RecordingSearchIndex::with_journal(journal.clone()));
        let service = build_service(store.clone(), cache.clone(), index.clone());

        Self {
            store,
            cache,
            index,
            journal,
            service,
        }
    }
}
