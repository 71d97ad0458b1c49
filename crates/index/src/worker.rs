use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use crate::IndexingService;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Consumes the crawl-job queue: claims the oldest pending job (skipping
/// rows other workers hold) and runs it to a terminal state. Several
/// workers can poll the same table safely.
pub struct JobWorker {
    service: Arc<IndexingService>,
    poll_interval: Duration,
}

impl JobWorker {
    pub fn new(service: Arc<IndexingService>) -> Self {
        Self {
            service,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll-and-run loop. Runs until the surrounding task is cancelled;
    /// job failures are recorded on the job row and do not stop the loop.
    pub async fn run(&self) -> Result<()> {
        info!(poll_secs = self.poll_interval.as_secs(), "job worker started");

        loop {
            match self.service.store().claim_next_pending_job().await {
                Ok(Some(job)) => {
                    info!(job_id = %job.id, seed = %job.seed_url, "claimed crawl job");
                    if let Err(e) = self.service.run_crawl_job(&job).await {
                        error!(job_id = %job.id, error = %e, "crawl job failed");
                    }
                }
                Ok(None) => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    error!(error = %e, "failed to poll for pending jobs");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
