use anyhow::Result;
use uuid::Uuid;

use websift_core::AppConfig;
use websift_store::Storage;

pub async fn run(config: AppConfig, job_id: Option<Uuid>) -> Result<()> {
    let storage = Storage::new(&config.database.url).await?;

    let Some(job_id) = job_id else {
        let pages = storage.get_page_count().await?;
        let chunks = storage.get_chunk_count().await?;
        println!("Index: {pages} pages, {chunks} chunks");
        return Ok(());
    };

    match storage.get_crawl_job(job_id).await? {
        Some(job) => {
            println!("Job {}", job.id);
            println!("  seed:          {}", job.seed_url);
            println!("  status:        {}", job.status);
            println!("  pages crawled: {}", job.pages_crawled);
            println!("  pages indexed: {}", job.pages_indexed);
            if let Some(started) = job.started_at {
                println!("  started:       {started}");
            }
            if let Some(completed) = job.completed_at {
                println!("  completed:     {completed}");
            }
            if let Some(error) = job.error_message {
                println!("  error:         {error}");
            }
        }
        None => {
            println!("No crawl job with id {job_id}");
        }
    }

    Ok(())
}
