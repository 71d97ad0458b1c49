use anyhow::Result;
use tokio::signal;
use tracing::info;

use websift_core::AppConfig;
use websift_index::JobWorker;

use crate::commands::{build_service, shutdown_crawler};

pub async fn run(config: AppConfig) -> Result<()> {
    let (crawler, service) = build_service(&config).await?;
    let worker = JobWorker::new(service.clone());

    tokio::select! {
        result = worker.run() => result?,
        _ = signal::ctrl_c() => {
            info!("shutdown requested, stopping worker");
        }
    }

    drop(worker);
    drop(service);
    shutdown_crawler(crawler).await;

    Ok(())
}
