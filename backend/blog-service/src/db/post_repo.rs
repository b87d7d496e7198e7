use super::{PostStore, StoreError};
use crate::models::{ActivityLog, Post, PostDraft, ACTION_NEW_POST};
use crate::metrics::observe_store_acquire;
use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use tokio::time::Instant;
use tracing::warn;

/// Await a connection or transaction from the pool, recording the wait and
/// any failure under `op`.
async fn checkout<T, F>(op: &'static str, pending: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    let result = pending.await;
    observe_store_acquire(op, started.elapsed(), result.as_ref().err());
    result.map_err(StoreError::from)
}

/// PostgreSQL-backed store of record
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Activity log rows recorded for a post, oldest first.
    pub async fn activity_for_post(&self, post_id: i64) -> Result<Vec<ActivityLog>, StoreError> {
        let mut conn = checkout("activity_for_post", self.pool.acquire()).await?;
        let rows = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, action, post_id, logged_at
            FROM activity_logs
            WHERE post_id = $1
            ORDER BY id
            "#,
        )
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn read_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let mut conn = checkout("read_by_id", self.pool.acquire()).await?;
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, tags, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(post)
    }

    async fn read_by_tag(&self, tag: &str) -> Result<Vec<Post>, StoreError> {
        let mut conn = checkout("read_by_tag", self.pool.acquire()).await?;
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, tags, created_at
            FROM posts
            WHERE tags @> ARRAY[$1]::text[]
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tag)
        .fetch_all(&mut *conn)
        .await?;

        Ok(posts)
    }

    async fn create_with_log(&self, draft: &PostDraft) -> Result<i64, StoreError> {
        let mut tx = checkout("create_with_log", self.pool.begin()).await?;

        let (post_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO posts (title, content, tags)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(draft.title())
        .bind(draft.content())
        .bind(draft.tags().to_vec())
        .fetch_one(&mut *tx)
        .await?;

        let logged = sqlx::query(
            r#"
            INSERT INTO activity_logs (action, post_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(ACTION_NEW_POST)
        .bind(post_id)
        .execute(&mut *tx)
        .await;

        if let Err(source) = logged {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after activity log failure failed");
            }
            return Err(StoreError::ActivityLog { source });
        }

        tx.commit().await?;

        Ok(post_id)
    }

    async fn update(&self, id: i64, draft: &PostDraft) -> Result<u64, StoreError> {
        let mut conn = checkout("update", self.pool.acquire()).await?;
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $1, content = $2, tags = $3
            WHERE id = $4
            "#,
        )
        .bind(draft.title())
        .bind(draft.content())
        .bind(draft.tags().to_vec())
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
