use anyhow::{ensure, Result};

use websift_core::AppConfig;
use websift_index::ContentStatus;

use crate::commands::{build_service, shutdown_crawler};

pub async fn run(
    config: AppConfig,
    urls: Vec<String>,
    markdown: bool,
    summary: bool,
    summary_words: usize,
) -> Result<()> {
    ensure!(
        (1..=10).contains(&urls.len()),
        "provide between 1 and 10 URLs"
    );

    let (crawler, service) = build_service(&config).await?;
    let response = service
        .get_contents(&urls, markdown, summary, summary_words)
        .await?;

    println!("Fetched {} URLs in {}ms:\n", urls.len(), response.took_ms);
    for item in &response.results {
        match item.status {
            ContentStatus::Success => {
                println!("  {} - {}", item.url, item.title.as_deref().unwrap_or_default());
                if let Some(summary) = &item.summary {
                    println!("    summary: {summary}");
                }
                if let Some(text) = &item.content {
                    let preview: String = text.chars().take(200).collect();
                    println!("    {preview}");
                }
                if markdown {
                    if let Some(md) = &item.markdown {
                        println!("    markdown: {} chars", md.len());
                    }
                }
            }
            ContentStatus::Error => {
                println!(
                    "  {} - ERROR: {}",
                    item.url,
                    item.error.as_deref().unwrap_or("unknown")
                );
            }
        }
        println!();
    }

    drop(service);
    shutdown_crawler(crawler).await;

    Ok(())
}
