pub mod contents;
pub mod crawl;
pub mod search;
pub mod similar;
pub mod status;
pub mod worker;

use std::sync::Arc;

use anyhow::Result;

use websift_core::AppConfig;
use websift_crawler::CrawlerEngine;
use websift_embed::EmbeddingClient;
use websift_index::{IndexingService, SummaryClient};
use websift_store::Storage;

/// Wire up the full pipeline: storage (with migrations), embedder, browser,
/// optional summarizer. Constructed once per invocation; the browser dies
/// with the returned engine handle.
pub(crate) async fn build_service(
    config: &AppConfig,
) -> Result<(Arc<CrawlerEngine>, Arc<IndexingService>)> {
    let storage =
        Storage::with_pool_size(&config.database.url, config.database.max_connections).await?;
    storage.run_migrations().await?;

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    let embedder = EmbeddingClient::new(&config.embedding, api_key.clone());
    let summarizer = (config.summary.enabled && !api_key.is_empty())
        .then(|| SummaryClient::new(&config.summary, &config.embedding.api_base, api_key));

    let crawler = Arc::new(CrawlerEngine::launch(config.crawler.clone()).await?);

    let service = Arc::new(IndexingService::new(
        storage,
        embedder,
        crawler.clone(),
        summarizer,
        &config.embedding,
    ));

    Ok((crawler, service))
}

/// Shut the browser down if we are the last holder of the engine.
pub(crate) async fn shutdown_crawler(crawler: Arc<CrawlerEngine>) {
    if let Ok(mut engine) = Arc::try_unwrap(crawler) {
        engine.close().await;
    }
}
