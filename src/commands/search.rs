use anyhow::Result;

use websift_core::{AppConfig, SearchFilters};

use crate::commands::{build_service, shutdown_crawler};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: AppConfig,
    query: String,
    limit: usize,
    content: bool,
    highlights: bool,
    domains: Option<Vec<String>>,
    exclude_domains: Option<Vec<String>>,
    language: Option<String>,
) -> Result<()> {
    let filters = SearchFilters {
        domains,
        exclude_domains,
        language,
        ..Default::default()
    };

    let (crawler, service) = build_service(&config).await?;
    let response = service
        .search(&query, limit, content, highlights, &filters, None)
        .await?;

    println!(
        "Found {} results in {}ms:\n",
        response.total_results, response.took_ms
    );
    for result in &response.results {
        println!(
            "  [{:.3}] {} - {}",
            result.score,
            result.url,
            result.title.as_deref().unwrap_or_default()
        );
        if let Some(highlights) = &result.highlights {
            for highlight in highlights {
                println!("    > {highlight}");
            }
        }
        if let Some(text) = &result.content {
            let preview: String = text.chars().take(200).collect();
            println!("    {preview}");
        }
        println!();
    }

    drop(service);
    shutdown_crawler(crawler).await;

    Ok(())
}
