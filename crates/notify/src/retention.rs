//! Age-based purge of notification delivery records.
//!
//! Delivery rows are an audit trail with a bounded useful life; this loop
//! trims anything older than the retention window once an hour so the table
//! stays small enough to query. The window comes from
//! `DELIVERY_RETENTION_DAYS` and defaults to 30 days.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use rvois_db::repositories::NotificationDeliveryRepo;
use rvois_db::DbPool;

const DEFAULT_RETENTION_DAYS: i64 = 30;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Run the delivery-record purge loop until `cancel` fires.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    let retention_days: i64 = std::env::var("DELIVERY_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS);

    tracing::info!(retention_days, "Delivery record purge running hourly");

    let mut ticker = tokio::time::interval(PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => purge_once(&pool, retention_days).await,
        }
    }

    tracing::info!("Delivery record purge stopped");
}

/// Delete delivery rows past the retention window. Errors are logged and
/// swallowed; the next tick retries.
async fn purge_once(pool: &DbPool, retention_days: i64) {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days);
    match NotificationDeliveryRepo::delete_older_than(pool, cutoff).await {
        Ok(0) => {}
        Ok(deleted) => {
            tracing::info!(deleted, retention_days, "Trimmed aged delivery records");
        }
        Err(e) => {
            tracing::error!(error = %e, "Delivery record purge failed");
        }
    }
}
