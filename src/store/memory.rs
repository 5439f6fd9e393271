//! In-process store used by pipeline tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

use super::{Article, ArticleStore, InsertOutcome, NewArticle, Source, SourceProvider};

#[derive(Default)]
pub struct MemoryStore {
    sources: Mutex<Vec<Source>>,
    articles: Mutex<Vec<Article>>,
    fail_list_sources: AtomicBool,
    fail_mark: AtomicBool,
    /// Links whose insert fails with a store error.
    poisoned_links: Mutex<Vec<String>>,
}

fn broken() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&self, id: i64, name: &str, feed_url: &str) -> Source {
        let src = Source { id, name: name.to_string(), feed_url: feed_url.to_string(), created_at: Utc::now() };
        self.sources.lock().unwrap().push(src.clone());
        src
    }

    pub fn remove_source(&self, id: i64) {
        self.sources.lock().unwrap().retain(|s| s.id != id);
    }

    pub fn articles(&self) -> Vec<Article> {
        self.articles.lock().unwrap().clone()
    }

    pub fn article(&self, id: i64) -> Option<Article> {
        self.articles.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }

    pub fn set_fail_list_sources(&self, v: bool) {
        self.fail_list_sources.store(v, Ordering::SeqCst);
    }

    pub fn set_fail_mark(&self, v: bool) {
        self.fail_mark.store(v, Ordering::SeqCst);
    }

    pub fn poison_link(&self, link: &str) {
        self.poisoned_links.lock().unwrap().push(link.to_string());
    }
}

#[async_trait]
impl SourceProvider for MemoryStore {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        if self.fail_list_sources.load(Ordering::SeqCst) {
            return Err(broken());
        }
        Ok(self.sources.lock().unwrap().clone())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, article: NewArticle) -> Result<InsertOutcome, StoreError> {
        if self.poisoned_links.lock().unwrap().contains(&article.link) {
            return Err(broken());
        }
        let mut rows = self.articles.lock().unwrap();
        if rows.iter().any(|a| a.source_id == article.source_id && a.link == article.link) {
            return Ok(InsertOutcome::Duplicate);
        }
        let id = rows.len() as i64 + 1;
        rows.push(Article {
            id,
            source_id: article.source_id,
            title: article.title,
            link: article.link,
            summary: article.summary,
            published_at: article.published_at,
            posted_at: None,
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn list_unposted(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Article>, StoreError> {
        let mut out: Vec<Article> = self
            .articles
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.posted_at.is_none() && a.published_at >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.published_at.cmp(&b.published_at).then(a.id.cmp(&b.id)));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn mark_delivered(&self, id: i64) -> Result<(), StoreError> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(broken());
        }
        let mut rows = self.articles.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound { entity: "article", id })?;
        if row.posted_at.is_none() {
            row.posted_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_article(source_id: i64, link: &str, published_at: DateTime<Utc>) -> NewArticle {
        NewArticle {
            source_id,
            title: format!("title {link}"),
            link: link.to_string(),
            summary: String::new(),
            published_at,
        }
    }

    #[tokio::test]
    async fn duplicate_insert_leaves_one_eligible_article() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = store.insert_article(new_article(1, "https://a.test/1", now)).await.unwrap();
        let second = store.insert_article(new_article(1, "https://a.test/1", now)).await.unwrap();
        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::Duplicate);

        let eligible = store.list_unposted(now - Duration::hours(1), 10).await.unwrap();
        assert_eq!(eligible.len(), 1);
    }

    #[tokio::test]
    async fn same_link_from_other_source_is_distinct() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_article(new_article(1, "https://a.test/1", now)).await.unwrap();
        let out = store.insert_article(new_article(2, "https://a.test/1", now)).await.unwrap();
        assert_eq!(out, InsertOutcome::Inserted);
        assert_eq!(store.articles().len(), 2);
    }

    #[tokio::test]
    async fn mark_delivered_is_one_way() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_article(new_article(1, "https://a.test/1", now)).await.unwrap();
        store.mark_delivered(1).await.unwrap();
        let first = store.article(1).unwrap().posted_at;
        store.mark_delivered(1).await.unwrap();
        assert_eq!(store.article(1).unwrap().posted_at, first);
        assert!(store.article(1).unwrap().is_delivered());

        let err = store.mark_delivered(99).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 99, .. }));
    }
}
