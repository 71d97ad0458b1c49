use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::SiftError;

/// What the extractor pulls out of a single page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Boilerplate-stripped plain text. None when extraction found no article body.
    pub content: Option<String>,
    pub markdown: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Two-letter language code, lowercased.
    pub language: Option<String>,
    /// Raw href values as they appear in the page; resolution against the
    /// page URL is the crawler's job.
    pub links: Vec<String>,
    pub word_count: usize,
}

/// Outcome of fetching one URL.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    /// HTTP status, or 0 when no response was obtained (timeout, navigation failure).
    pub http_status: u16,
    pub doc: Option<ExtractedDocument>,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl CrawlResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.doc.is_some()
    }
}

/// A stored page row.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: Uuid,
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub markdown: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub content_hash: Option<String>,
    pub http_status: Option<i32>,
    pub crawled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting or refreshing a page. The store derives
/// `content_hash` from `content` on write.
#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub markdown: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub http_status: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, SiftError> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(SiftError::Storage(format!("unknown job status: {other}"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A site-crawl job row. Jobs reference pages by URL only, so they stay
/// valid as historical records even after page deletion.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlJob {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub seed_url: String,
    pub domain: String,
    pub max_pages: i32,
    pub include_subdomains: bool,
    pub status: JobStatus,
    pub pages_crawled: i32,
    pub pages_indexed: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Structured search restrictions. Every field is optional; absence means
/// no restriction on that axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub domains: Option<Vec<String>>,
    pub exclude_domains: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub language: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.domains.is_none()
            && self.exclude_domains.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.language.is_none()
    }
}

/// Network location of a URL: lowercased host plus an explicit port when
/// present. This is the "domain" stored on pages and tested for crawl scope.
pub fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_lowercase();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netloc_drops_default_port() {
        let url = Url::parse("https://Example.COM/path").unwrap();
        assert_eq!(netloc(&url), "example.com");
    }

    #[test]
    fn netloc_keeps_explicit_port() {
        let url = Url::parse("http://a.test:8080/").unwrap();
        assert_eq!(netloc(&url), "a.test:8080");
    }

    #[test]
    fn job_status_round_trip() {
        for s in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(JobStatus::parse("paused").is_err());
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
