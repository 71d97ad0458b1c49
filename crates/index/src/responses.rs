use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One ranked page in a search or find-similar response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub score: f64,
    pub published_date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub total_results: usize,
    pub took_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Success,
    Error,
}

/// Per-URL entry in a contents response. A failed fetch never sinks the
/// batch; it becomes an `Error` entry alongside the successes.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub markdown: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub status: ContentStatus,
    pub error: Option<String>,
}

impl ContentItem {
    pub fn error(url: &str, message: String) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            content: None,
            markdown: None,
            summary: None,
            author: None,
            published_date: None,
            status: ContentStatus::Error,
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentsResponse {
    pub results: Vec<ContentItem>,
    pub took_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarResponse {
    pub source_url: String,
    pub results: Vec<SearchResultItem>,
    pub took_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
