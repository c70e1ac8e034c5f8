use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::scan_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Retention sweep (runs hourly). The opportunistic sweep at the start
    /// of analyze/regenerate is the primary one; this keeps idle processes
    /// tidy.
    async fn scan_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;

            match tasks::sweep_expired_scans(&scheduler.context).await {
                Ok(count) if count > 0 => info!("Retention sweep removed {} scans", count),
                Ok(_) => {}
                Err(e) => error!("Retention sweep failed: {}", e),
            }
        }
    }

    /// Storage health probe (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                error!("Storage health check failed: {}", e);
            }
        }
    }
}
