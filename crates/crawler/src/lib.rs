use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use websift_core::config::CrawlerConfig;
use websift_core::{netloc, CrawlResult, SiftError};
use websift_extract::ContentExtractor;

/// Invoked after each BFS batch with (completed, total, last result). Must
/// stay cheap; the walker awaits it before fetching the next level.
pub type ProgressCallback =
    Box<dyn FnMut(usize, usize, &CrawlResult) -> BoxFuture<'static, ()> + Send>;

/// Headless-browser fetch pool. One Chrome instance per engine; a counting
/// semaphore caps how many pages render at once.
pub struct CrawlerEngine {
    browser: Browser,
    handler_task: JoinHandle<()>,
    semaphore: Arc<Semaphore>,
    extractor: ContentExtractor,
    config: CrawlerConfig,
}

impl CrawlerEngine {
    /// Launch the browser. This is the only failure that aborts a site walk;
    /// everything downstream degrades to per-URL errors.
    pub async fn launch(config: CrawlerConfig) -> Result<Self, SiftError> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .window_size(1280, 720)
            .build()
            .map_err(SiftError::Fetch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SiftError::Fetch(format!("browser launch failed: {e}")))?;

        // Drive the CDP message loop for the life of the browser
        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        info!(
            max_concurrent = config.max_concurrent,
            timeout_secs = config.fetch_timeout_secs,
            "crawler engine launched"
        );

        Ok(Self {
            browser,
            handler_task,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            extractor: ContentExtractor::new(),
            config,
        })
    }

    pub async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        self.handler_task.abort();
    }

    /// Fetch one URL with JS rendering. Never fails: network trouble, HTTP
    /// errors, and timeouts all come back as a `CrawlResult` carrying the
    /// status and error message.
    pub async fn fetch_one(&self, url: &str) -> CrawlResult {
        let fetched_at = Utc::now();

        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                return CrawlResult {
                    url: url.to_string(),
                    http_status: 0,
                    doc: None,
                    error: Some(format!("invalid URL: {e}")),
                    fetched_at,
                }
            }
        };

        let _permit = self.semaphore.acquire().await.ok();

        let page = match self.browser.new_page("about:blank").await {
            Ok(p) => p,
            Err(e) => {
                return CrawlResult {
                    url: url.to_string(),
                    http_status: 0,
                    doc: None,
                    error: Some(format!("failed to open page: {e}")),
                    fetched_at,
                }
            }
        };

        let outcome = self.render(&page, url).await;

        // the tab is closed on every exit path
        if let Err(e) = page.close().await {
            debug!(url, error = %e, "page close failed");
        }

        match outcome {
            Ok((status, _)) if status >= 400 => CrawlResult {
                url: url.to_string(),
                http_status: status,
                doc: None,
                error: Some(format!("HTTP {status}")),
                fetched_at,
            },
            Ok((status, html)) => {
                let doc = self.extractor.extract(&parsed, &html);
                CrawlResult {
                    url: url.to_string(),
                    http_status: status,
                    doc: Some(doc),
                    error: None,
                    fetched_at,
                }
            }
            Err(SiftError::Timeout(_)) => CrawlResult {
                url: url.to_string(),
                http_status: 0,
                doc: None,
                error: Some("timeout".to_string()),
                fetched_at,
            },
            Err(e) => CrawlResult {
                url: url.to_string(),
                http_status: 0,
                doc: None,
                error: Some(e.to_string()),
                fetched_at,
            },
        }
    }

    async fn render(&self, page: &Page, url: &str) -> Result<(u16, String), SiftError> {
        page.set_user_agent(self.config.user_agent.as_str())
            .await
            .map_err(|e| SiftError::Fetch(e.to_string()))?;

        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        // navigate and wait for the main document response, bounded by the
        // per-URL timeout
        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| SiftError::Fetch(e.to_string()))?;
            page.wait_for_navigation_response()
                .await
                .map_err(|e| SiftError::Fetch(e.to_string()))
        };
        let response = tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| SiftError::Timeout(self.config.fetch_timeout_secs))??;

        let status = response
            .and_then(|r| r.response.as_ref().map(|resp| resp.status as u16))
            .unwrap_or(0);

        if status >= 400 {
            return Ok((status, String::new()));
        }

        // let the DOM settle, then snapshot the rendered HTML
        page.wait_for_navigation()
            .await
            .map_err(|e| SiftError::Fetch(e.to_string()))?;
        let html = page
            .content()
            .await
            .map_err(|e| SiftError::Fetch(e.to_string()))?;

        Ok((status, html))
    }

    /// Fetch many URLs in parallel, bounded by the pool cap. Results come
    /// back in input order.
    pub async fn fetch_many(&self, urls: &[String]) -> Vec<CrawlResult> {
        join_all(urls.iter().map(|u| self.fetch_one(u))).await
    }

    /// Breadth-first site walk from `seed_url`, bounded by `max_pages`.
    ///
    /// The visited set and frontier live on this task; link enqueueing only
    /// happens between batches, so each BFS level sees a settled dedup
    /// frontier. Per-URL failures are recorded in the results and never
    /// abort the walk.
    pub async fn crawl_site(
        &self,
        seed_url: &str,
        max_pages: usize,
        include_subdomains: bool,
        mut on_progress: Option<ProgressCallback>,
    ) -> Result<Vec<CrawlResult>, SiftError> {
        let seed = Url::parse(seed_url)
            .map_err(|e| SiftError::InvalidUrl(format!("{seed_url}: {e}")))?;
        let base_domain = netloc(&seed);

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = VecDeque::from([seed_url.to_string()]);
        let mut results: Vec<CrawlResult> = Vec::new();

        while !frontier.is_empty() && results.len() < max_pages {
            let batch_size = self.config.max_concurrent.min(max_pages - results.len());
            let mut batch: Vec<String> = Vec::with_capacity(batch_size);

            while let Some(url) = frontier.pop_front() {
                if batch.len() >= batch_size {
                    frontier.push_front(url);
                    break;
                }
                let Some(normalized) = normalize_url(&url) else {
                    continue;
                };
                if visited.insert(normalized) {
                    batch.push(url);
                }
            }
            if batch.is_empty() {
                break;
            }

            debug!(
                batch = batch.len(),
                fetched = results.len(),
                frontier = frontier.len(),
                "crawling batch"
            );
            let batch_results = self.fetch_many(&batch).await;

            for result in batch_results {
                if let Some(doc) = &result.doc {
                    if let Ok(page_url) = Url::parse(&result.url) {
                        for link in &doc.links {
                            let Ok(resolved) = page_url.join(link) else {
                                continue;
                            };
                            if !in_scope(&resolved, &base_domain, include_subdomains) {
                                continue;
                            }
                            if let Some(normalized) = normalize_url(resolved.as_str()) {
                                if !visited.contains(&normalized) {
                                    frontier.push_back(resolved.into());
                                }
                            }
                        }
                    }
                }
                results.push(result);
            }

            if let (Some(cb), Some(last)) = (on_progress.as_mut(), results.last()) {
                cb(results.len(), max_pages, last).await;
            }
        }

        info!(
            pages = results.len(),
            seed = seed_url,
            "site crawl finished"
        );
        Ok(results)
    }
}

/// Canonical form used only for dedup; the original URL is what gets
/// fetched. Fragment dropped, trailing slashes stripped, query kept,
/// everything lowercased. Idempotent.
pub fn normalize_url(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let host = netloc(&url);
    let path = url.path().trim_end_matches('/');

    let mut normalized = format!("{}://{}{}", url.scheme(), host, path);
    if let Some(query) = url.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    Some(normalized.to_lowercase())
}

/// Scope test for the site walker: http(s) only, same netloc as the seed,
/// or a suffix match when subdomains are included.
pub fn in_scope(url: &Url, base_domain: &str, include_subdomains: bool) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let host = netloc(url);
    if include_subdomains {
        host.ends_with(base_domain)
    } else {
        host == base_domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_fragment_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://Example.com/Path/#section").unwrap(),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("https://example.com/").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn normalize_keeps_query() {
        assert_eq!(
            normalize_url("https://a.test/search?q=Fox&page=2").unwrap(),
            "https://a.test/search?q=fox&page=2"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "https://Example.com/Path/?q=X#frag",
            "http://a.test:8080/x/y/",
            "https://b.test",
        ] {
            let once = normalize_url(raw).unwrap();
            let twice = normalize_url(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(normalize_url("not a url").is_none());
    }

    #[test]
    fn scope_exact_host_only() {
        let base = "a.test";
        let same = Url::parse("https://a.test/page").unwrap();
        let sub = Url::parse("https://blog.a.test/page").unwrap();
        let other = Url::parse("https://b.test/page").unwrap();

        assert!(in_scope(&same, base, false));
        assert!(!in_scope(&sub, base, false));
        assert!(!in_scope(&other, base, false));
    }

    #[test]
    fn scope_with_subdomains() {
        let base = "a.test";
        let sub = Url::parse("https://blog.a.test/page").unwrap();
        let same = Url::parse("http://a.test/").unwrap();
        let other = Url::parse("https://b.test/").unwrap();

        assert!(in_scope(&sub, base, true));
        assert!(in_scope(&same, base, true));
        assert!(!in_scope(&other, base, true));
    }

    #[test]
    fn scope_rejects_non_http_schemes() {
        let ftp = Url::parse("ftp://a.test/file").unwrap();
        let mail = Url::parse("mailto:x@a.test").unwrap();
        assert!(!in_scope(&ftp, "a.test", true));
        assert!(!in_scope(&mail, "a.test", true));
    }
}
