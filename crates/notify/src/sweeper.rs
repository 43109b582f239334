//! Fallback escalation sweep loop.
//!
//! Claims due rows from the `fallback_tasks` store on a fixed interval and
//! hands each to [`VolunteerFallbackService::execute_task`]. Claiming is
//! destructive (the row is deleted under `FOR UPDATE SKIP LOCKED`), so each
//! escalation fires at most once even with concurrent sweepers, and pending
//! countdowns survive process restarts because the store is persistent.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use rvois_db::repositories::FallbackTaskRepo;
use rvois_db::DbPool;

use crate::fallback::VolunteerFallbackService;

/// Default sweep interval; bounds escalation-timer precision.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum tasks claimed per sweep cycle.
const CLAIM_BATCH_LIMIT: i64 = 32;

/// Background service that fires due fallback escalations.
pub struct FallbackSweeper {
    pool: DbPool,
    service: Arc<VolunteerFallbackService>,
    sweep_interval: Duration,
}

impl FallbackSweeper {
    /// Create a sweeper with the default interval, overridable via the
    /// `FALLBACK_SWEEP_INTERVAL_SECS` environment variable.
    pub fn new(pool: DbPool, service: Arc<VolunteerFallbackService>) -> Self {
        let sweep_interval = std::env::var("FALLBACK_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);
        Self {
            pool,
            service,
            sweep_interval,
        }
    }

    /// Create a sweeper with an explicit interval (used by tests).
    pub fn with_interval(
        pool: DbPool,
        service: Arc<VolunteerFallbackService>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            pool,
            service,
            sweep_interval,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        tracing::info!(
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            "Fallback sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Fallback sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// One sweep cycle: claim everything due and execute each task.
    ///
    /// Task execution never returns an error (the fallback service contains
    /// its own failures), so one bad escalation cannot stall the rest of
    /// the batch.
    pub async fn sweep_once(&self) {
        let due = match FallbackTaskRepo::claim_due(&self.pool, Utc::now(), CLAIM_BATCH_LIMIT).await
        {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim due fallback tasks");
                return;
            }
        };

        if due.is_empty() {
            return;
        }

        tracing::debug!(count = due.len(), "Claimed due fallback tasks");
        for task in &due {
            self.service.execute_task(task).await;
        }
    }
}
