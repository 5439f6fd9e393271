use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::error::StoreError;

use super::{Article, ArticleStore, InsertOutcome, NewArticle, Source, SourceProvider};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    feed_url: String,
    created_at: DateTime<Utc>,
}

impl From<SourceRow> for Source {
    fn from(r: SourceRow) -> Self {
        Source { id: r.id, name: r.name, feed_url: r.feed_url, created_at: r.created_at }
    }
}

#[derive(FromRow)]
struct ArticleRow {
    id: i64,
    source_id: i64,
    title: String,
    link: String,
    summary: String,
    published_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(r: ArticleRow) -> Self {
        Article {
            id: r.id,
            source_id: r.source_id,
            title: r.title,
            link: r.link,
            summary: r.summary,
            published_at: r.published_at,
            posted_at: r.posted_at,
            created_at: r.created_at,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn source_by_id(&self, id: i64) -> Result<Source, StoreError> {
        let row = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT id, name, feed_url, created_at
            FROM sources
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Source::from).ok_or(StoreError::NotFound { entity: "source", id })
    }

    /// Insert a source, or rename it if the URL is already registered.
    /// Returns the id and whether a new row was created.
    pub async fn add_source(&self, name: &str, feed_url: &str) -> Result<(i64, bool), StoreError> {
        let (id, inserted): (i64, bool) = sqlx::query_as(
            r#"
            INSERT INTO sources (name, feed_url)
            VALUES ($1, $2)
            ON CONFLICT (feed_url) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(name)
        .bind(feed_url)
        .fetch_one(&self.pool)
        .await?;
        Ok((id, inserted))
    }

    pub async fn delete_source(&self, id: i64) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "source", id });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceProvider for PgStore {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT id, name, feed_url, created_at
            FROM sources
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Source::from).collect())
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn insert_article(&self, article: NewArticle) -> Result<InsertOutcome, StoreError> {
        let exec = sqlx::query(
            r#"
            INSERT INTO articles (source_id, title, link, summary, published_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_id, link) DO NOTHING
            "#,
        )
        .bind(article.source_id)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.summary)
        .bind(article.published_at)
        .execute(&self.pool)
        .await?;
        if exec.rows_affected() == 1 { Ok(InsertOutcome::Inserted) } else { Ok(InsertOutcome::Duplicate) }
    }

    async fn list_unposted(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, source_id, title, link, summary, published_at, posted_at, created_at
            FROM articles
            WHERE posted_at IS NULL
              AND published_at >= $1
            ORDER BY published_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn mark_delivered(&self, id: i64) -> Result<(), StoreError> {
        // COALESCE keeps the first delivery timestamp if marked twice
        let res = sqlx::query(
            r#"
            UPDATE articles
            SET posted_at = COALESCE(posted_at, now())
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "article", id });
        }
        Ok(())
    }
}
