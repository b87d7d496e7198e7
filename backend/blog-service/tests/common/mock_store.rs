//! Store of record fake backed by a map.

use super::Journal;
use async_trait::async_trait;
use blog_service::db::{PostStore, StoreError};
use blog_service::models::{ActivityLog, Post, PostDraft, ACTION_NEW_POST};
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: Mutex<BTreeMap<i64, Post>>,
    logs: Mutex<Vec<ActivityLog>>,
    next_id: Mutex<i64>,
    reads_by_id: AtomicUsize,
    fail_activity_log: AtomicBool,
    unavailable: AtomicBool,
    stalled: AtomicBool,
    journal: Option<Journal>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Number of `read_by_id` calls so far.
    pub fn reads_by_id(&self) -> usize {
        self.reads_by_id.load(Ordering::SeqCst)
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn logs_for(&self, post_id: i64) -> Vec<ActivityLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.post_id == post_id)
            .cloned()
            .collect()
    }

    /// Make the next creations fail on the activity log insert.
    pub fn fail_activity_log(&self, fail: bool) {
        self.fail_activity_log.store(fail, Ordering::SeqCst);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every call hang until cancelled.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    fn record(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }

    async fn check_available(&self) -> Result<(), StoreError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "connection to 10.0.0.5:5432 refused".into(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn read_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        self.check_available().await?;
        self.reads_by_id.fetch_add(1, Ordering::SeqCst);
        self.record(format!("store.read:{}", id));
        Ok(self.posts.lock().unwrap().get(&id).cloned())
    }

    async fn read_by_tag(&self, tag: &str) -> Result<Vec<Post>, StoreError> {
        self.check_available().await?;
        let mut matches: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|post| post.tags.iter().any(|t| t == tag))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches)
    }

    async fn create_with_log(&self, draft: &PostDraft) -> Result<i64, StoreError> {
        self.check_available().await?;

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };

        // The post row only becomes visible together with its log row.
        if self.fail_activity_log.load(Ordering::SeqCst) {
            self.record(format!("store.rollback:{}", id));
            return Err(StoreError::ActivityLog {
                source: sqlx::Error::Protocol("activity_logs insert rejected".into()),
            });
        }

        let created_at = Utc::now() + ChronoDuration::milliseconds(id);
        self.posts.lock().unwrap().insert(
            id,
            Post {
                id,
                title: draft.title().to_string(),
                content: draft.content().to_string(),
                tags: draft.tags().to_vec(),
                created_at,
            },
        );
        self.logs.lock().unwrap().push(ActivityLog {
            id,
            action: ACTION_NEW_POST.to_string(),
            post_id: id,
            logged_at: created_at,
        });
        self.record(format!("store.create:{}", id));

        Ok(id)
    }

    async fn update(&self, id: i64, draft: &PostDraft) -> Result<u64, StoreError> {
        self.check_available().await?;
        let mut posts = self.posts.lock().unwrap();
        match posts.get_mut(&id) {
            Some(post) => {
                post.title = draft.title().to_string();
                post.content = draft.content().to_string();
                post.tags = draft.tags().to_vec();
                drop(posts);
                self.record(format!("store.update:{}", id));
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
