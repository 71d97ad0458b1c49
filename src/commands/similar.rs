use anyhow::Result;

use websift_core::AppConfig;

use crate::commands::{build_service, shutdown_crawler};

pub async fn run(
    config: AppConfig,
    url: String,
    limit: usize,
    content: bool,
    include_source_domain: bool,
) -> Result<()> {
    let (crawler, service) = build_service(&config).await?;

    let response = service
        .find_similar(&url, limit, content, !include_source_domain)
        .await?;

    if let Some(error) = &response.error {
        println!("Could not resolve {}: {error}", response.source_url);
    } else {
        println!(
            "{} pages similar to {} ({}ms):\n",
            response.results.len(),
            response.source_url,
            response.took_ms
        );
        for result in &response.results {
            println!(
                "  [{:.3}] {} - {}",
                result.score,
                result.url,
                result.title.as_deref().unwrap_or_default()
            );
        }
    }

    drop(service);
    shutdown_crawler(crawler).await;

    Ok(())
}
