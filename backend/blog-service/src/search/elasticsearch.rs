use super::{SearchError, SearchIndex};
use crate::models::SearchDocument;
use async_trait::async_trait;
use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::IndicesCreateParts,
    Elasticsearch, IndexParts, SearchParts,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

const INDEX_NOT_FOUND: &str = "index_not_found_exception";

#[derive(Clone)]
pub struct ElasticsearchIndex {
    client: Elasticsearch,
    index: String,
    max_results: usize,
}

impl ElasticsearchIndex {
    /// Build a client for a single node. Does not touch the cluster; the
    /// index is created lazily the first time a search finds it missing.
    pub fn new(url: &str, index: &str, max_results: usize) -> Result<Self, SearchError> {
        let parsed = Url::parse(url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool).build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index: index.to_string(),
            max_results,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub async fn ping(&self) -> Result<(), SearchError> {
        let response = self.client.ping().send().await?;
        let status = response.status_code();
        if status.is_success() {
            Ok(())
        } else {
            Err(SearchError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    async fn create_index(&self) -> Result<(), SearchError> {
        let body = json!({
            "mappings": {
                "properties": {
                    "id": { "type": "long" },
                    "title": { "type": "text" },
                    "content": { "type": "text" }
                }
            }
        });

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %self.index, "created search index");
            return Ok(());
        }

        // A concurrent request may have created it first.
        let error: Value = response.json().await.unwrap_or(Value::Null);
        if error_type(&error) == Some("resource_already_exists_exception") {
            debug!(index = %self.index, "search index already exists");
            return Ok(());
        }

        Err(SearchError::Rejected {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn upsert(&self, doc: &SearchDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .index(IndexParts::IndexId(&self.index, doc.id.to_string().as_str()))
            .body(doc)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(post_id = doc.id, status = status.as_u16(), body = %body, "search index rejected document");
            return Err(SearchError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>, SearchError> {
        let body = json!({
            "size": self.max_results,
            "query": {
                "multi_match": {
                    "query": query,
                    "fields": ["title", "content"]
                }
            }
        });

        let response = self
            .client
            .search(SearchParts::Index(&[self.index.as_str()]))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            let parsed: SearchResponse = response.json().await?;
            return Ok(parsed.into_documents());
        }

        let error: Value = response.json().await.unwrap_or(Value::Null);
        if error_type(&error) == Some(INDEX_NOT_FOUND) {
            warn!(index = %self.index, "search index missing; creating it");
            if let Err(e) = self.create_index().await {
                warn!(index = %self.index, error = %e, "failed to create search index");
            }
            return Err(SearchError::IndexMissing {
                index: self.index.clone(),
            });
        }

        warn!(status = status.as_u16(), body = %error, "search request rejected");
        Err(SearchError::Rejected {
            status: status.as_u16(),
        })
    }
}

/// `error.type` of an Elasticsearch error body.
fn error_type(body: &Value) -> Option<&str> {
    body.get("error")?.get("type")?.as_str()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Option<SearchDocument>,
}

impl SearchResponse {
    fn into_documents(self) -> Vec<SearchDocument> {
        self.hits.hits.into_iter().filter_map(|hit| hit.source).collect()
    }
}
