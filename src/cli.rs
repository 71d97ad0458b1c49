use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "websift", about = "Self-hosted semantic web search: crawl, index, query")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a site from a seed URL and index its pages
    Crawl {
        /// Seed URL
        #[arg(long)]
        url: String,

        /// Maximum pages to crawl (1..=1000)
        #[arg(short, long, default_value = "100")]
        max_pages: i32,

        /// Follow links to subdomains of the seed's domain
        #[arg(long)]
        include_subdomains: bool,
    },
    /// Run a worker that consumes queued crawl jobs until interrupted
    Worker,
    /// Semantic search over the index
    Search {
        /// Search query
        #[arg(short, long)]
        query: String,

        /// Max results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Include full page content in results
        #[arg(long)]
        content: bool,

        /// Include query highlights in results
        #[arg(long)]
        highlights: bool,

        /// Only these domains (comma-separated)
        #[arg(long, value_delimiter = ',')]
        domains: Option<Vec<String>>,

        /// Never these domains (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_domains: Option<Vec<String>>,

        /// Two-letter language code filter
        #[arg(long)]
        language: Option<String>,
    },
    /// Find pages similar to a URL
    Similar {
        /// Source URL
        #[arg(long)]
        url: String,

        /// Max results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Include full page content in results
        #[arg(long)]
        content: bool,

        /// Allow results from the source page's own domain
        #[arg(long)]
        include_source_domain: bool,
    },
    /// Fetch page contents, crawling any URL not in the index yet
    Contents {
        /// URLs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        urls: Vec<String>,

        /// Include the markdown rendition
        #[arg(long)]
        markdown: bool,

        /// Generate a model summary per page
        #[arg(long)]
        summary: bool,

        /// Summary word budget
        #[arg(long, default_value = "200")]
        summary_words: usize,
    },
    /// Show index stats, or the status of one crawl job
    Status {
        /// Job id (omit for overall index stats)
        #[arg(long)]
        job: Option<Uuid>,
    },
}
