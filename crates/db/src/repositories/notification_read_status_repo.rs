//! Repository for the `notification_read_status` table.

use sqlx::PgPool;

use rvois_core::types::DbId;

use crate::models::notification::NotificationReadStatus;

/// Column list for `notification_read_status` queries.
const COLUMNS: &str = "id, notification_id, user_id, read_via, read_at";

/// Records through which channel a notification read was observed.
pub struct NotificationReadStatusRepo;

impl NotificationReadStatusRepo {
    /// Upsert the read record for a (notification, user) pair.
    ///
    /// The pair is unique, so repeat read events refresh `read_at` and
    /// `read_via` in place rather than creating duplicate rows.
    pub async fn upsert(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
        read_via: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_read_status (notification_id, user_id, read_via, read_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (notification_id, user_id) DO UPDATE SET \
                 read_via = EXCLUDED.read_via, \
                 read_at = NOW()",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(read_via)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch the read record for a (notification, user) pair.
    pub async fn get(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<Option<NotificationReadStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_read_status \
             WHERE notification_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, NotificationReadStatus>(&query)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
