//! Repository for the `notification_deliveries` table.

use sqlx::PgPool;

use rvois_core::status::delivery;
use rvois_core::types::{DbId, Timestamp};

use crate::models::notification::NotificationDelivery;

/// Column list for `notification_deliveries` queries.
const COLUMNS: &str = "id, user_id, notification_id, status, attempt_count, last_attempt_at, \
    error_message, delivered_at, read_at, created_at";

/// Provides delivery-attempt bookkeeping for notifications.
pub struct NotificationDeliveryRepo;

impl NotificationDeliveryRepo {
    /// Record a delivery attempt for a (user, notification) pair.
    ///
    /// Uses `INSERT ... ON CONFLICT (user_id, notification_id) DO UPDATE` to
    /// upsert in a single round-trip: a first attempt inserts a row with
    /// `attempt_count = 1`; later attempts increment the counter and replace
    /// status/error. `delivered_at` is stamped only when the new status is
    /// `DELIVERED` and is never regressed once set.
    pub async fn record_attempt(
        pool: &PgPool,
        user_id: DbId,
        notification_id: DbId,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_deliveries \
                 (user_id, notification_id, status, attempt_count, last_attempt_at, \
                  error_message, delivered_at) \
             VALUES ($1, $2, $3, 1, NOW(), $4, \
                     CASE WHEN $3 = $5 THEN NOW() END) \
             ON CONFLICT (user_id, notification_id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 attempt_count = notification_deliveries.attempt_count + 1, \
                 last_attempt_at = NOW(), \
                 error_message = EXCLUDED.error_message, \
                 delivered_at = COALESCE(notification_deliveries.delivered_at, \
                                         CASE WHEN EXCLUDED.status = $5 THEN NOW() END)",
        )
        .bind(user_id)
        .bind(notification_id)
        .bind(status)
        .bind(error_message)
        .bind(delivery::DELIVERED)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Stamp the delivery row as read: sets `read_at` and advances the status
    /// to `DELIVERED` (a read implies delivery). Preserves any earlier
    /// `delivered_at`.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_deliveries \
             SET read_at = NOW(), \
                 status = $3, \
                 delivered_at = COALESCE(delivered_at, NOW()) \
             WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(delivery::DELIVERED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch the delivery row for a (user, notification) pair.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
        notification_id: DbId,
    ) -> Result<Option<NotificationDelivery>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_deliveries \
             WHERE user_id = $1 AND notification_id = $2"
        );
        sqlx::query_as::<_, NotificationDelivery>(&query)
            .bind(user_id)
            .bind(notification_id)
            .fetch_optional(pool)
            .await
    }

    /// Purge delivery rows older than the cutoff (retention cleanup).
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_deliveries WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
