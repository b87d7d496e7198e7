/// Data models for blog-service
///
/// - `Post`: the store-of-record row, also the cached snapshot
/// - `ActivityLog`: side-effect row written with every post creation
/// - `PostDraft`: validated title/content/tags for create and update
/// - `SearchDocument`: the projection pushed into the search index
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Action label recorded for every post creation.
pub const ACTION_NEW_POST: &str = "new_post";

pub const MAX_TAG_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub action: String,
    pub post_id: i64,
    pub logged_at: DateTime<Utc>,
}

/// Title, content and tags ready to be written.
///
/// Tags are an ordered set: surrounding whitespace is trimmed and repeats
/// collapse onto their first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    title: String,
    content: String,
    tags: Vec<String>,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tags: Vec<String>) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".to_string()));
        }

        let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
        for raw in tags {
            let tag = raw.trim();
            if tag.is_empty() {
                return Err(AppError::BadRequest("tags must not be empty".to_string()));
            }
            if tag.chars().count() > MAX_TAG_LEN {
                return Err(AppError::BadRequest(format!(
                    "tags must be at most {} characters",
                    MAX_TAG_LEN
                )));
            }
            if !normalized.iter().any(|existing| existing == tag) {
                normalized.push(tag.to_string());
            }
        }

        Ok(Self {
            title,
            content: content.into(),
            tags: normalized,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Document shape held by the search index.
///
/// Tags are deliberately left out; tag lookups go to the store of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchDocument {
    pub id: i64,
    pub title: String,
    pub content: String,
}

impl SearchDocument {
    pub fn from_draft(id: i64, draft: &PostDraft) -> Self {
        Self {
            id,
            title: draft.title().to_string(),
            content: draft.content().to_string(),
        }
    }
}
