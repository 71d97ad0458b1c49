use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use websift_core::{NewPage, Page};

mod jobs;
mod search;

pub use search::SearchHit;

const SAVE_PAGE_SQL: &str = r#"INSERT INTO pages
    (url, domain, title, description, content, markdown, author, published_at, language, content_hash, http_status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (url) DO UPDATE SET
        domain = EXCLUDED.domain,
        title = EXCLUDED.title,
        description = EXCLUDED.description,
        content = EXCLUDED.content,
        markdown = EXCLUDED.markdown,
        author = EXCLUDED.author,
        published_at = EXCLUDED.published_at,
        language = EXCLUDED.language,
        content_hash = EXCLUDED.content_hash,
        http_status = EXCLUDED.http_status,
        updated_at = now()
    RETURNING id, url, domain, title, description, content, markdown, author,
              published_at, language, content_hash, http_status, crawled_at, updated_at"#;

const PAGE_COLUMNS: &str = "id, url, domain, title, description, content, markdown, author, \
                            published_at, language, content_hash, http_status, crawled_at, updated_at";

#[derive(sqlx::FromRow)]
struct PageRow {
    id: Uuid,
    url: String,
    domain: String,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    markdown: Option<String>,
    author: Option<String>,
    published_at: Option<DateTime<Utc>>,
    language: Option<String>,
    content_hash: Option<String>,
    http_status: Option<i32>,
    crawled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PageRow> for Page {
    fn from(row: PageRow) -> Self {
        Page {
            id: row.id,
            url: row.url,
            domain: row.domain,
            title: row.title,
            description: row.description,
            content: row.content,
            markdown: row.markdown,
            author: row.author,
            published_at: row.published_at,
            language: row.language,
            content_hash: row.content_hash,
            http_status: row.http_status,
            crawled_at: row.crawled_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_size(database_url, 16).await
    }

    pub async fn with_pool_size(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await?;
        info!("migrations complete");
        Ok(())
    }

    pub async fn check_connectivity(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert the page, or refresh the existing row for the same URL. The
    /// content hash is derived here so it can never drift from the content.
    pub async fn save_page(&self, page: &NewPage) -> Result<Page> {
        let content_hash = page.content.as_deref().map(content_hash);

        let row: PageRow = sqlx::query_as(SAVE_PAGE_SQL)
            .bind(&page.url)
            .bind(&page.domain)
            .bind(&page.title)
            .bind(&page.description)
            .bind(&page.content)
            .bind(&page.markdown)
            .bind(&page.author)
            .bind(page.published_at)
            .bind(&page.language)
            .bind(content_hash)
            .bind(page.http_status)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    pub async fn get_page_by_url(&self, url: &str) -> Result<Option<Page>> {
        let row: Option<PageRow> =
            sqlx::query_as(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE url = $1"))
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
        let row: Option<PageRow> =
            sqlx::query_as(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_page_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn get_chunk_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_sha256_hex() {
        let hash = content_hash("The quick brown fox jumps over the lazy dog.");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("The quick brown fox jumps over the lazy dog."));
        assert_ne!(hash, content_hash("different"));
    }
}
