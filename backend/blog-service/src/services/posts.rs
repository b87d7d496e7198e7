/// Post service - cache-aside reads, write-then-invalidate, write-then-reindex
use crate::cache::PostCache;
use crate::db::PostStore;
use crate::error::{AppError, Backend, Result};
use crate::metrics::SEARCH_INDEX_UPSERTS;
use crate::models::{Post, PostDraft, SearchDocument};
use crate::search::SearchIndex;
use crate::timeout::{with_timeout, BackendTimeouts, TimeoutError};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    cache: PostCache,
    index: Arc<dyn SearchIndex>,
    timeouts: BackendTimeouts,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        cache: PostCache,
        index: Arc<dyn SearchIndex>,
        timeouts: BackendTimeouts,
    ) -> Self {
        Self {
            store,
            cache,
            index,
            timeouts,
        }
    }

    /// Get a post by ID, from the cache when possible.
    ///
    /// A miss costs exactly one store read and repopulates the cache.
    /// Concurrent misses for the same id each read the store.
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        if let Some(cached) = self.cache.lookup(id).await {
            return Ok(cached);
        }

        let post = self
            .store_call(self.store.read_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        self.cache.populate(&post).await;

        Ok(post)
    }

    /// Create a post and its activity log row, then index it.
    pub async fn create_post(&self, draft: PostDraft) -> Result<i64> {
        let id = self.store_call(self.store.create_with_log(&draft)).await?;
        debug!(post_id = id, "post created");

        self.reindex(SearchDocument::from_draft(id, &draft)).await;

        Ok(id)
    }

    /// Replace a post's title, content and tags.
    ///
    /// The cache entry is dropped only after the update has committed; it is
    /// not repopulated here, so the next read goes to the store.
    pub async fn update_post(&self, id: i64, draft: PostDraft) -> Result<()> {
        let affected = self.store_call(self.store.update(id, &draft)).await?;
        if affected == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        self.cache.invalidate(id).await;
        self.reindex(SearchDocument::from_draft(id, &draft)).await;

        Ok(())
    }

    /// Posts carrying `tag`, newest first. Always read from the store.
    pub async fn search_by_tag(&self, tag: &str) -> Result<Vec<Post>> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::BadRequest("tag is required".to_string()));
        }

        self.store_call(self.store.read_by_tag(tag)).await
    }

    /// Full-text search over title and content.
    pub async fn search_posts(&self, query: &str) -> Result<Vec<SearchDocument>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest(
                "query parameter 'q' is required".to_string(),
            ));
        }

        match with_timeout(self.timeouts.index, self.index.search(query)).await {
            Ok(docs) => Ok(docs),
            Err(TimeoutError::Elapsed(after)) => Err(AppError::Timeout {
                backend: Backend::SearchIndex,
                after,
            }),
            Err(TimeoutError::Failed(e)) => Err(AppError::Search(e)),
        }
    }

    async fn store_call<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, crate::db::StoreError>>,
    {
        match with_timeout(self.timeouts.store, call).await {
            Ok(value) => Ok(value),
            Err(TimeoutError::Elapsed(after)) => Err(AppError::Timeout {
                backend: Backend::Store,
                after,
            }),
            Err(TimeoutError::Failed(e)) => Err(AppError::Store(e)),
        }
    }

    /// Best-effort upsert; failures are logged and counted, never returned.
    async fn reindex(&self, doc: SearchDocument) {
        match with_timeout(self.timeouts.index, self.index.upsert(&doc)).await {
            Ok(()) => {
                SEARCH_INDEX_UPSERTS.with_label_values(&["success"]).inc();
            }
            Err(TimeoutError::Elapsed(after)) => {
                SEARCH_INDEX_UPSERTS.with_label_values(&["timeout"]).inc();
                warn!(post_id = doc.id, ?after, "search index upsert timed out");
            }
            Err(TimeoutError::Failed(e)) => {
                SEARCH_INDEX_UPSERTS.with_label_values(&["error"]).inc();
                warn!(post_id = doc.id, error = %e, "search index upsert failed");
            }
        }
    }
}
