//! Repository for the append-only `volunteer_fallback_logs` audit table.

use sqlx::PgPool;

use rvois_core::types::DbId;

use crate::models::fallback::FallbackLogEntry;

/// Column list for `volunteer_fallback_logs` queries.
const COLUMNS: &str = "id, incident_id, volunteer_id, event_type, metadata, created_at";

/// Append-only audit trail of fallback-escalation events.
pub struct FallbackLogRepo;

impl FallbackLogRepo {
    /// Append an audit entry.
    pub async fn insert(
        pool: &PgPool,
        incident_id: DbId,
        volunteer_id: Option<DbId>,
        event_type: &str,
        metadata: serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO volunteer_fallback_logs (incident_id, volunteer_id, event_type, metadata) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(incident_id)
        .bind(volunteer_id)
        .bind(event_type)
        .bind(metadata)
        .fetch_one(pool)
        .await
    }

    /// List the audit trail for an incident, oldest first.
    pub async fn list_for_incident(
        pool: &PgPool,
        incident_id: DbId,
    ) -> Result<Vec<FallbackLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM volunteer_fallback_logs \
             WHERE incident_id = $1 \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, FallbackLogEntry>(&query)
            .bind(incident_id)
            .fetch_all(pool)
            .await
    }
}
