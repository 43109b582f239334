//! Repository for the `incident_views` table.

use sqlx::PgPool;

use rvois_core::types::{DbId, Timestamp};

/// Existence checks against the view-signal log.
pub struct IncidentViewRepo;

impl IncidentViewRepo {
    /// Whether the user has viewed the incident at or after `since`.
    ///
    /// A missing `incident_views` table (undefined-table error) is treated as
    /// "no signal" rather than an error, so the escalation flow degrades
    /// gracefully on deployments without view tracking.
    pub async fn viewed_since(
        pool: &PgPool,
        incident_id: DbId,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM incident_views \
                 WHERE incident_id = $1 AND user_id = $2 AND viewed_at >= $3 \
             )",
        )
        .bind(incident_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await;

        match result {
            Ok(exists) => Ok(exists),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("42P01") => {
                // undefined_table: view tracking not deployed.
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Record a view event (used by the web layer; exposed here for tests).
    pub async fn record(
        pool: &PgPool,
        incident_id: DbId,
        user_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO incident_views (incident_id, user_id, viewed_at) \
             VALUES ($1, $2, NOW())",
        )
        .bind(incident_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
