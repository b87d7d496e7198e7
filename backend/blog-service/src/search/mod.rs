/// Search index gateway
///
/// Full-text lookups over post title and content. The index is a derived
/// projection of the store of record and may lag or miss posts.
pub mod elasticsearch;

pub use self::elasticsearch::ElasticsearchIndex;

use crate::models::SearchDocument;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(#[from] ::elasticsearch::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid Elasticsearch URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build transport: {0}")]
    Build(#[from] ::elasticsearch::http::transport::BuildError),

    /// The index did not exist. It has been created (empty) for next time.
    #[error("search index {index} did not exist")]
    IndexMissing { index: String },

    #[error("search index rejected request with status {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or fully replace the document keyed by `doc.id`.
    async fn upsert(&self, doc: &SearchDocument) -> Result<(), SearchError>;

    /// Documents whose title or content match `query`, best match first.
    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>, SearchError>;
}
