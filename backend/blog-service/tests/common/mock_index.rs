//! Search index fake keeping documents by id.

use super::Journal;
use async_trait::async_trait;
use blog_service::models::SearchDocument;
use blog_service::search::{SearchError, SearchIndex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingSearchIndex {
    docs: Mutex<BTreeMap<i64, SearchDocument>>,
    upserts: AtomicUsize,
    failing: AtomicBool,
    stalled: AtomicBool,
    missing: AtomicBool,
    journal: Option<Journal>,
}

impl RecordingSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn document(&self, id: i64) -> Option<SearchDocument> {
        self.docs.lock().unwrap().get(&id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Behave as if the index does not exist until the next search creates it.
    pub fn drop_index(&self) {
        self.docs.lock().unwrap().clear();
        self.missing.store(true, Ordering::SeqCst);
    }

    async fn check_available(&self) -> Result<(), SearchError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::Rejected { status: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for RecordingSearchIndex {
    async fn upsert(&self, doc: &SearchDocument) -> Result<(), SearchError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.check_available().await?;
        if let Some(journal) = &self.journal {
            journal.record(format!("index.upsert:{}", doc.id));
        }
        self.docs.lock().unwrap().insert(doc.id, doc.clone());
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>, SearchError> {
        self.check_available().await?;
        if self.missing.swap(false, Ordering::SeqCst) {
            return Err(SearchError::IndexMissing {
                index: "posts".to_string(),
            });
        }

        let needle = query.to_lowercase();
        Ok(self
            .docs
            .lock()
            .unwrap()
            .values()
            .filter(|doc| {
                doc.title.to_lowercase().contains(&needle)
                    || doc.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}
