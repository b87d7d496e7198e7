/// Store gateway
///
/// The relational store of record for posts and their activity log. Each
/// call borrows a pooled connection for its own duration only.
pub mod post_repo;

pub use post_repo::PgPostStore;

use crate::models::{Post, PostDraft};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The log row could not be written, so the post insert was rolled back.
    #[error("activity log insert failed: {source}")]
    ActivityLog {
        #[source]
        source: sqlx::Error,
    },
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn read_by_id(&self, id: i64) -> Result<Option<Post>, StoreError>;

    /// Posts carrying `tag`, newest first. No match is an empty vector.
    async fn read_by_tag(&self, tag: &str) -> Result<Vec<Post>, StoreError>;

    /// Insert the post and its `new_post` log row as one transaction.
    async fn create_with_log(&self, draft: &PostDraft) -> Result<i64, StoreError>;

    /// Replace title, content and tags. Returns the affected row count; zero
    /// means no such post.
    async fn update(&self, id: i64, draft: &PostDraft) -> Result<u64, StoreError>;
}
