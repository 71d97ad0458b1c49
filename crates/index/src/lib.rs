pub mod responses;
pub mod summary;
pub mod worker;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use websift_core::config::EmbeddingConfig;
use websift_core::{
    netloc, CrawlJob, ExtractedDocument, JobStatus, NewPage, Page, SearchFilters, SiftError,
};
use websift_crawler::{CrawlerEngine, ProgressCallback};
use websift_embed::{chunk_text, EmbeddingClient};
use websift_extract::{highlights, DEFAULT_MAX_HIGHLIGHTS, DEFAULT_WINDOW_CHARS};
use websift_store::{SearchHit, Storage};

pub use responses::{
    ContentItem, ContentStatus, ContentsResponse, SearchResponse, SearchResultItem,
    SimilarResponse,
};
pub use summary::SummaryClient;
pub use worker::JobWorker;

/// Orchestrates crawler, extractor, embedder, and store. The only component
/// that touches all of them; constructed once with explicit dependencies.
pub struct IndexingService {
    store: Storage,
    embedder: EmbeddingClient,
    crawler: Arc<CrawlerEngine>,
    summarizer: Option<SummaryClient>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IndexingService {
    pub fn new(
        store: Storage,
        embedder: EmbeddingClient,
        crawler: Arc<CrawlerEngine>,
        summarizer: Option<SummaryClient>,
        embedding: &EmbeddingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            crawler,
            summarizer,
            chunk_size: embedding.chunk_size,
            chunk_overlap: embedding.chunk_overlap,
        }
    }

    pub fn store(&self) -> &Storage {
        &self.store
    }

    /// Semantic search over the index. Logging the query is best-effort and
    /// never affects the response.
    pub async fn search(
        &self,
        query: &str,
        num_results: usize,
        include_content: bool,
        include_highlights: bool,
        filters: &SearchFilters,
        owner: Option<Uuid>,
    ) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(SiftError::InvalidInput("empty query".to_string()).into());
        }

        let started = Instant::now();

        let query_embedding = self.embedder.embed_query(query).await?;
        let hits = self.store.search(&query_embedding, num_results, filters).await?;

        let results: Vec<SearchResultItem> = hits
            .into_iter()
            .map(|hit| {
                let hit_highlights = include_highlights
                    .then(|| {
                        hit.page_content.as_deref().map(|content| {
                            highlights(content, query, DEFAULT_MAX_HIGHLIGHTS, DEFAULT_WINDOW_CHARS)
                        })
                    })
                    .flatten();
                to_result_item(hit, include_content, hit_highlights)
            })
            .collect();

        let took_ms = started.elapsed().as_millis() as u64;

        let filters_json = (!filters.is_empty())
            .then(|| serde_json::to_string(filters).ok())
            .flatten();
        if let Err(e) = self
            .store
            .log_search_query(
                owner,
                query,
                num_results as i32,
                filters_json,
                results.len() as i32,
                took_ms as i32,
            )
            .await
        {
            warn!(error = %e, "failed to log search query");
        }

        Ok(SearchResponse {
            query: query.to_string(),
            total_results: results.len(),
            results,
            took_ms,
        })
    }

    /// Fetch page contents for each URL: from the store when already
    /// crawled, live otherwise. Fresh pages are saved but not indexed here.
    /// Per-URL fetch failures become error entries; the batch always
    /// completes.
    pub async fn get_contents(
        &self,
        urls: &[String],
        include_markdown: bool,
        include_summary: bool,
        summary_max_words: usize,
    ) -> Result<ContentsResponse> {
        let started = Instant::now();
        let mut results = Vec::with_capacity(urls.len());

        for url in urls {
            let mut item = match self.store.get_page_by_url(url).await? {
                Some(page) => {
                    debug!(url = %url, "contents served from store");
                    ContentItem {
                        url: url.clone(),
                        title: page.title,
                        content: page.content,
                        markdown: include_markdown.then_some(page.markdown).flatten(),
                        summary: None,
                        author: page.author,
                        published_date: page.published_at,
                        status: ContentStatus::Success,
                        error: None,
                    }
                }
                None => {
                    let crawl = self.crawler.fetch_one(url).await;
                    match (&crawl.doc, &crawl.error) {
                        (Some(doc), None) => {
                            let page = self.save_crawled(url, doc, crawl.http_status).await?;
                            ContentItem {
                                url: url.clone(),
                                title: page.title,
                                content: page.content,
                                markdown: include_markdown.then_some(page.markdown).flatten(),
                                summary: None,
                                author: page.author,
                                published_date: page.published_at,
                                status: ContentStatus::Success,
                                error: None,
                            }
                        }
                        (_, error) => ContentItem::error(
                            url,
                            error.clone().unwrap_or_else(|| "no content".to_string()),
                        ),
                    }
                }
            };

            if include_summary && item.status == ContentStatus::Success {
                item.summary = self.maybe_summarize(item.content.as_deref(), summary_max_words).await;
            }

            results.push(item);
        }

        Ok(ContentsResponse {
            results,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Pages similar to the given URL. If the URL is not in the index yet,
    /// it is crawled, saved, and indexed first so its embeddings exist; a
    /// failed crawl returns an empty result with the error rather than a
    /// partial index.
    pub async fn find_similar(
        &self,
        url: &str,
        num_results: usize,
        include_content: bool,
        exclude_source_domain: bool,
    ) -> Result<SimilarResponse> {
        let started = Instant::now();

        let page = match self.store.get_page_by_url(url).await? {
            Some(page) => page,
            None => {
                let crawl = self.crawler.fetch_one(url).await;
                match (crawl.doc, crawl.error) {
                    (Some(doc), None) => {
                        let page = self.save_crawled(url, &doc, crawl.http_status).await?;
                        self.index_page(&page).await?;
                        page
                    }
                    (_, error) => {
                        return Ok(SimilarResponse {
                            source_url: url.to_string(),
                            results: Vec::new(),
                            took_ms: started.elapsed().as_millis() as u64,
                            error: Some(error.unwrap_or_else(|| "no content".to_string())),
                        })
                    }
                }
            }
        };

        let hits = self
            .store
            .find_similar_to_page(page.id, num_results, exclude_source_domain)
            .await?;

        let results = hits
            .into_iter()
            .map(|hit| to_result_item(hit, include_content, None))
            .collect();

        Ok(SimilarResponse {
            source_url: url.to_string(),
            results,
            took_ms: started.elapsed().as_millis() as u64,
            error: None,
        })
    }

    /// Chunk, embed, and store a page's content. Returns the number of
    /// chunks written; 0 when the page has no indexable text.
    pub async fn index_page(&self, page: &Page) -> Result<usize> {
        let Some(content) = page.content.as_deref().filter(|c| !c.trim().is_empty()) else {
            debug!(url = %page.url, "page has no main text, skipping index");
            return Ok(0);
        };

        let chunks = chunk_text(content, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let written = self
            .store
            .upsert_page_chunks(page.id, &chunks, &embeddings)
            .await?;
        debug!(url = %page.url, chunks = written, "indexed page");
        Ok(written)
    }

    /// Drive a crawl job to a terminal state: walk the site, persist
    /// progress per batch, save and index every successful page. Per-page
    /// index failures are counted and logged but do not fail the job.
    pub async fn run_crawl_job(&self, job: &CrawlJob) -> Result<()> {
        if job.status == JobStatus::Pending {
            self.store.mark_job_running(job.id).await?;
        }

        let progress_store = self.store.clone();
        let job_id = job.id;
        let on_progress: ProgressCallback = Box::new(move |completed, _total, _last| {
            let store = progress_store.clone();
            Box::pin(async move {
                if let Err(e) = store.set_job_pages_crawled(job_id, completed as i32).await {
                    warn!(job_id = %job_id, error = %e, "failed to persist crawl progress");
                }
            })
        });

        let results = match self
            .crawler
            .crawl_site(
                &job.seed_url,
                job.max_pages as usize,
                job.include_subdomains,
                Some(on_progress),
            )
            .await
        {
            Ok(results) => results,
            Err(e) => {
                self.store.fail_job(job.id, &e.to_string()).await?;
                return Err(e.into());
            }
        };

        self.store
            .set_job_pages_crawled(job.id, results.len() as i32)
            .await?;

        let mut indexed = 0i32;
        let mut index_misses = 0usize;
        for result in &results {
            if !result.is_success() {
                continue;
            }
            let Some(doc) = result.doc.as_ref() else {
                continue;
            };

            let page = match self.save_crawled(&result.url, doc, result.http_status).await {
                Ok(page) => page,
                Err(e) => {
                    // the store being down is fatal to the job
                    self.store.fail_job(job.id, &e.to_string()).await.ok();
                    return Err(e);
                }
            };

            match self.index_page(&page).await {
                Ok(written) if written > 0 => {
                    indexed += 1;
                    if let Err(e) = self.store.set_job_pages_indexed(job.id, indexed).await {
                        warn!(job_id = %job.id, error = %e, "failed to persist index progress");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    index_misses += 1;
                    warn!(url = %result.url, error = %e, "failed to index page");
                }
            }
        }

        self.store.complete_job(job.id).await?;
        info!(
            job_id = %job.id,
            crawled = results.len(),
            indexed,
            index_misses,
            "crawl job completed"
        );
        Ok(())
    }

    async fn save_crawled(
        &self,
        url: &str,
        doc: &ExtractedDocument,
        http_status: u16,
    ) -> Result<Page> {
        let parsed = Url::parse(url).map_err(|e| SiftError::InvalidUrl(format!("{url}: {e}")))?;

        let new_page = NewPage {
            url: url.to_string(),
            domain: netloc(&parsed),
            title: doc.title.clone(),
            description: doc.description.clone(),
            content: doc.content.clone(),
            markdown: doc.markdown.clone(),
            author: doc.author.clone(),
            published_at: doc.published_at,
            language: doc.language.clone(),
            http_status: Some(http_status as i32),
        };

        self.store.save_page(&new_page).await
    }

    async fn maybe_summarize(&self, content: Option<&str>, max_words: usize) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        let content = content?;
        match summarizer.summarize(content, max_words).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                None
            }
        }
    }
}

fn to_result_item(
    hit: SearchHit,
    include_content: bool,
    highlights: Option<Vec<String>>,
) -> SearchResultItem {
    SearchResultItem {
        id: hit.page_id,
        url: hit.url,
        title: hit.title,
        score: hit.score,
        published_date: hit.published_at,
        author: hit.author,
        content: include_content.then_some(hit.page_content).flatten(),
        highlights,
    }
}
