use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use websift_core::{CrawlJob, JobStatus};

use crate::Storage;

const JOB_COLUMNS: &str = "id, owner_id, seed_url, domain, max_pages, include_subdomains, \
                           status, pages_crawled, pages_indexed, created_at, started_at, \
                           completed_at, error_message";

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    owner_id: Option<Uuid>,
    seed_url: String,
    domain: String,
    max_pages: i32,
    include_subdomains: bool,
    status: String,
    pages_crawled: i32,
    pages_indexed: i32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<JobRow> for CrawlJob {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(CrawlJob {
            id: row.id,
            owner_id: row.owner_id,
            seed_url: row.seed_url,
            domain: row.domain,
            max_pages: row.max_pages,
            include_subdomains: row.include_subdomains,
            status: JobStatus::parse(&row.status)?,
            pages_crawled: row.pages_crawled,
            pages_indexed: row.pages_indexed,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

impl Storage {
    pub async fn create_crawl_job(
        &self,
        owner_id: Option<Uuid>,
        seed_url: &str,
        domain: &str,
        max_pages: i32,
        include_subdomains: bool,
    ) -> Result<CrawlJob> {
        let row: JobRow = sqlx::query_as(&format!(
            "INSERT INTO crawl_jobs (owner_id, seed_url, domain, max_pages, include_subdomains) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {JOB_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(seed_url)
        .bind(domain)
        .bind(max_pages)
        .bind(include_subdomains)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    pub async fn get_crawl_job(&self, id: Uuid) -> Result<Option<CrawlJob>> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM crawl_jobs WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Pop the oldest pending job and mark it running in one statement.
    /// `SKIP LOCKED` lets several workers poll the same table without
    /// handing the same job out twice.
    pub async fn claim_next_pending_job(&self) -> Result<Option<CrawlJob>> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "UPDATE crawl_jobs SET status = 'running', started_at = now() \
             WHERE id = ( \
                 SELECT id FROM crawl_jobs WHERE status = 'pending' \
                 ORDER BY created_at \
                 FOR UPDATE SKIP LOCKED \
                 LIMIT 1 \
             ) \
             RETURNING {JOB_COLUMNS}"
        ))
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn mark_job_running(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET status = 'running', started_at = now() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Counters only ever grow; GREATEST guards against a late batch update
    /// racing a newer one.
    pub async fn set_job_pages_crawled(&self, id: Uuid, pages_crawled: i32) -> Result<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET pages_crawled = GREATEST(pages_crawled, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(pages_crawled)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_job_pages_indexed(&self, id: Uuid, pages_indexed: i32) -> Result<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET pages_indexed = GREATEST(pages_indexed, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(pages_indexed)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn complete_job(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET status = 'completed', completed_at = now() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        debug!(job_id = %id, "crawl job completed");
        Ok(())
    }

    pub async fn fail_job(&self, id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET status = 'failed', completed_at = now(), error_message = $2 \
             WHERE id = $1 AND status IN ('pending', 'running')",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Analytics row for a search. Callers treat failures as best-effort.
    pub async fn log_search_query(
        &self,
        owner_id: Option<Uuid>,
        query: &str,
        num_results: i32,
        filters_json: Option<String>,
        results_count: i32,
        latency_ms: i32,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_queries (owner_id, query, num_results, filters, results_count, latency_ms) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(owner_id)
        .bind(query)
        .bind(num_results)
        .bind(filters_json)
        .bind(results_count)
        .bind(latency_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
