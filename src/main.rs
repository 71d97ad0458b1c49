mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc keeps long crawls from bloating resident memory under glibc malloc
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use websift_core::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Credentials and tuning knobs come from the environment
    if let Ok(v) = std::env::var("DATABASE_URL") {
        config.database.url = v;
    }
    if let Ok(v) = std::env::var("WEBSIFT_MAX_CONCURRENT") {
        if let Some(n) = v.parse::<usize>().ok().filter(|&n| n > 0 && n <= 64) {
            config.crawler.max_concurrent = n;
        }
    }
    if let Ok(v) = std::env::var("WEBSIFT_FETCH_TIMEOUT") {
        if let Some(n) = v.parse::<u64>().ok().filter(|&n| n > 0) {
            config.crawler.fetch_timeout_secs = n;
        }
    }

    match cli.command {
        Commands::Crawl {
            url,
            max_pages,
            include_subdomains,
        } => {
            commands::crawl::run(config, url, max_pages, include_subdomains).await?;
        }
        Commands::Worker => {
            commands::worker::run(config).await?;
        }
        Commands::Search {
            query,
            limit,
            content,
            highlights,
            domains,
            exclude_domains,
            language,
        } => {
            commands::search::run(
                config, query, limit, content, highlights, domains, exclude_domains, language,
            )
            .await?;
        }
        Commands::Similar {
            url,
            limit,
            content,
            include_source_domain,
        } => {
            commands::similar::run(config, url, limit, content, include_source_domain).await?;
        }
        Commands::Contents {
            urls,
            markdown,
            summary,
            summary_words,
        } => {
            commands::contents::run(config, urls, markdown, summary, summary_words).await?;
        }
        Commands::Status { job } => {
            commands::status::run(config, job).await?;
        }
    }

    Ok(())
}
