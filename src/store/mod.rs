//! Persisted records and the narrow contracts the pipelines consume.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;

mod pg;
#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

/// A configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted item. Delivered once `posted_at` is set; it is never cleared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Article {
    #[cfg(test)]
    pub fn is_delivered(&self) -> bool {
        self.posted_at.is_some()
    }
}

/// Insert payload; the store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// `(source_id, link)` already present; nothing written.
    Duplicate,
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert unless an article with the same `(source_id, link)` exists.
    async fn insert_article(&self, article: NewArticle) -> Result<InsertOutcome, StoreError>;

    /// Undelivered articles published at or after `since`, oldest first.
    async fn list_unposted(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Article>, StoreError>;

    async fn mark_delivered(&self, id: i64) -> Result<(), StoreError>;
}
