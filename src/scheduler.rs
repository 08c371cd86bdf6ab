use std::sync::Arc;

use futures::StreamExt;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::SchedulerConfig;
use crate::tracker::ProductTracker;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub changed: usize,
    pub failed: usize,
}

/// Long-lived periodic recheck of every tracked product. Started once at
/// process startup and shut down with it.
pub struct RecheckScheduler {
    scheduler: JobScheduler,
    tracker: Arc<ProductTracker>,
    config: SchedulerConfig,
}

impl RecheckScheduler {
    pub async fn new(tracker: Arc<ProductTracker>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Internal(format!("failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            tracker,
            config,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        let tracker = Arc::clone(&self.tracker);
        let concurrency = self.config.max_concurrent_checks;

        let job = Job::new_async(self.config.recheck_interval.as_str(), move |_uuid, _l| {
            let tracker = Arc::clone(&tracker);
            Box::pin(async move {
                let summary = run_batch(tracker, concurrency).await;
                tracing::info!(
                    total = summary.total,
                    changed = summary.changed,
                    failed = summary.failed,
                    "Recheck batch finished"
                );
            })
        })
        .map_err(|e| AppError::Internal(format!("invalid recheck schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Internal(format!("failed to add recheck job: {e}")))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::Internal(format!("failed to start scheduler: {e}")))?;

        tracing::info!(cron = %self.config.recheck_interval, "Recheck scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Internal(format!("scheduler shutdown failed: {e}")))?;
        tracing::info!("Recheck scheduler shutdown");
        Ok(())
    }
}

/// One full recheck pass over all tracked products.
///
/// Every product is handled independently: a failed extraction, fetch, or
/// save is logged and the batch moves on. Failed items get no special
/// treatment; the next scheduled run simply tries them again.
pub async fn run_batch(tracker: Arc<ProductTracker>, concurrency: usize) -> BatchSummary {
    let products = match tracker.list().await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Failed to load tracked products for recheck: {e}");
            return BatchSummary::default();
        }
    };

    let total = products.len();
    tracing::debug!(total, "Starting recheck batch");

    let outcomes: Vec<std::result::Result<bool, ()>> = futures::stream::iter(products)
        .map(|mut product| {
            let tracker = Arc::clone(&tracker);
            async move {
                match tracker.recheck(&mut product).await {
                    Ok(changed) => {
                        if changed {
                            tracing::info!(
                                url = %product.url,
                                price = %product.current_price,
                                "Price changed: {}",
                                product.title
                            );
                        }
                        Ok(changed)
                    }
                    Err(e) => {
                        tracing::warn!(
                            url = %product.url,
                            "Recheck failed, will retry on next run: {e}"
                        );
                        Err(())
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    BatchSummary {
        total,
        changed: outcomes.iter().filter(|o| matches!(o, Ok(true))).count(),
        failed: outcomes.iter().filter(|o| o.is_err()).count(),
    }
}
