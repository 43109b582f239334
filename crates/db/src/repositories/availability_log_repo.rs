//! Repository for the `volunteer_availability_log` audit table.

use sqlx::PgPool;

use rvois_core::types::DbId;

use crate::models::volunteer::AvailabilityLogEntry;

/// Column list for `volunteer_availability_log` queries.
const COLUMNS: &str = "id, volunteer_id, previous_status, new_status, reason, created_at";

/// Append-only audit trail of availability flips.
pub struct AvailabilityLogRepo;

impl AvailabilityLogRepo {
    /// Append an availability-change entry.
    pub async fn insert(
        pool: &PgPool,
        volunteer_id: DbId,
        previous_status: bool,
        new_status: bool,
        reason: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO volunteer_availability_log \
                 (volunteer_id, previous_status, new_status, reason) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(volunteer_id)
        .bind(previous_status)
        .bind(new_status)
        .bind(reason)
        .fetch_one(pool)
        .await
    }

    /// List the audit trail for a volunteer, newest first.
    pub async fn list_for_volunteer(
        pool: &PgPool,
        volunteer_id: DbId,
    ) -> Result<Vec<AvailabilityLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM volunteer_availability_log \
             WHERE volunteer_id = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, AvailabilityLogEntry>(&query)
            .bind(volunteer_id)
            .fetch_all(pool)
            .await
    }
}
