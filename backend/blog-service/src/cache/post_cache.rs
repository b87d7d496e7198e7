use super::{post_key, CacheStore, POST_TTL};
use crate::metrics::{POST_CACHE_LOOKUPS, POST_CACHE_WRITES};
use crate::models::Post;
use crate::timeout::{with_timeout, TimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Cache-aside wrapper for post snapshots.
///
/// Never fails a caller: every backend error, timeout or undecodable entry
/// is logged and reported as a miss (reads) or swallowed (writes).
#[derive(Clone)]
pub struct PostCache {
    store: Arc<dyn CacheStore>,
    op_timeout: Duration,
}

impl PostCache {
    pub fn new(store: Arc<dyn CacheStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// Snapshot for `id`, or `None` on miss or any cache failure.
    pub async fn lookup(&self, id: i64) -> Option<Post> {
        let key = post_key(id);

        let raw = match with_timeout(self.op_timeout, self.store.get(&key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                POST_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                return None;
            }
            Err(TimeoutError::Elapsed(after)) => {
                POST_CACHE_LOOKUPS.with_label_values(&["timeout"]).inc();
                warn!(post_id = id, ?after, "cache read timed out; falling back to store");
                return None;
            }
            Err(TimeoutError::Failed(e)) => {
                POST_CACHE_LOOKUPS.with_label_values(&["error"]).inc();
                warn!(post_id = id, error = %e, "cache read failed; falling back to store");
                return None;
            }
        };

        match serde_json::from_str::<Post>(&raw) {
            Ok(post) => {
                POST_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                debug!(post_id = id, "cache hit");
                Some(post)
            }
            Err(e) => {
                POST_CACHE_LOOKUPS.with_label_values(&["corrupt"]).inc();
                warn!(post_id = id, error = %e, "dropping undecodable cache entry");
                if let Err(e) = with_timeout(self.op_timeout, self.store.delete(&key)).await {
                    debug!(post_id = id, error = %e, "failed to drop undecodable cache entry");
                }
                None
            }
        }
    }

    /// Store a snapshot with the fixed post TTL. Best effort.
    pub async fn populate(&self, post: &Post) {
        let value = match serde_json::to_string(post) {
            Ok(value) => value,
            Err(e) => {
                POST_CACHE_WRITES.with_label_values(&["populate", "error"]).inc();
                warn!(post_id = post.id, error = %e, "failed to encode post for cache");
                return;
            }
        };

        let key = post_key(post.id);
        match with_timeout(self.op_timeout, self.store.set(&key, &value, POST_TTL)).await {
            Ok(()) => {
                POST_CACHE_WRITES.with_label_values(&["populate", "success"]).inc();
            }
            Err(TimeoutError::Elapsed(after)) => {
                POST_CACHE_WRITES.with_label_values(&["populate", "timeout"]).inc();
                warn!(post_id = post.id, ?after, "cache populate timed out");
            }
            Err(TimeoutError::Failed(e)) => {
                POST_CACHE_WRITES.with_label_values(&["populate", "error"]).inc();
                warn!(post_id = post.id, error = %e, "cache populate failed");
            }
        }
    }

    /// Drop the snapshot for `id`. Best effort; a failure leaves a stale
    /// entry that lives until its TTL runs out.
    pub async fn invalidate(&self, id: i64) {
        let key = post_key(id);
        match with_timeout(self.op_timeout, self.store.delete(&key)).await {
            Ok(()) => {
                POST_CACHE_WRITES.with_label_values(&["invalidate", "success"]).inc();
                debug!(post_id = id, "cache invalidated");
            }
            Err(TimeoutError::Elapsed(after)) => {
                POST_CACHE_WRITES.with_label_values(&["invalidate", "timeout"]).inc();
                error!(post_id = id, ?after, "cache invalidation timed out; entry may be stale until TTL");
            }
            Err(TimeoutError::Failed(e)) => {
                POST_CACHE_WRITES.with_label_values(&["invalidate", "error"]).inc();
                error!(post_id = id, error = %e, "cache invalidation failed; entry may be stale until TTL");
            }
        }
    }
}
