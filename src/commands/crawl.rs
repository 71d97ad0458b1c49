use anyhow::{ensure, Result};

use url::Url;
use websift_core::{netloc, AppConfig};

use crate::commands::{build_service, shutdown_crawler};

pub async fn run(
    config: AppConfig,
    url: String,
    max_pages: i32,
    include_subdomains: bool,
) -> Result<()> {
    ensure!(
        (1..=1000).contains(&max_pages),
        "max_pages must be between 1 and 1000"
    );
    let seed = Url::parse(&url)?;
    ensure!(
        matches!(seed.scheme(), "http" | "https"),
        "seed URL must be http or https"
    );

    let (crawler, service) = build_service(&config).await?;

    let job = service
        .store()
        .create_crawl_job(None, &url, &netloc(&seed), max_pages, include_subdomains)
        .await?;

    println!("Started crawl job {} for {}", job.id, url);

    let outcome = service.run_crawl_job(&job).await;

    if let Some(finished) = service.store().get_crawl_job(job.id).await? {
        println!(
            "Job {}: {} ({} crawled, {} indexed)",
            finished.id, finished.status, finished.pages_crawled, finished.pages_indexed
        );
        if let Some(error) = finished.error_message {
            println!("  error: {error}");
        }
    }

    drop(service);
    shutdown_crawler(crawler).await;

    outcome
}
