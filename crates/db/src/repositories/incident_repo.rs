//! Repository for the `incidents` table.
//!
//! The incident table is owned by the CRUD layer; this repo only exposes the
//! reads the fallback engine and availability recalculator need.

use sqlx::PgPool;

use rvois_core::status::OPEN_ASSIGNMENT_STATUSES;
use rvois_core::types::DbId;

use crate::models::incident::Incident;

/// Column list for `incidents` queries.
const COLUMNS: &str =
    "id, incident_type, barangay, status, assigned_to, assigned_at, created_at, resolved_at";

/// Provides read access to incident assignment state.
pub struct IncidentRepo;

impl IncidentRepo {
    /// Fetch a single incident by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM incidents WHERE id = $1");
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count a volunteer's currently open assignments (assigned or responding).
    pub async fn count_open_for_volunteer(
        pool: &PgPool,
        volunteer_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let open: Vec<String> = OPEN_ASSIGNMENT_STATUSES.iter().map(|s| s.to_string()).collect();
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM incidents \
             WHERE assigned_to = $1 AND status = ANY($2)",
        )
        .bind(volunteer_id)
        .bind(&open)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Count a volunteer's total resolved incidents (experience bonus input).
    pub async fn count_resolved_for_volunteer(
        pool: &PgPool,
        volunteer_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM incidents \
             WHERE assigned_to = $1 AND resolved_at IS NOT NULL",
        )
        .bind(volunteer_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Fetch a volunteer's most recently resolved incidents, newest first.
    ///
    /// Used to derive the historical average resolution time.
    pub async fn recent_resolved_for_volunteer(
        pool: &PgPool,
        volunteer_id: DbId,
        limit: i64,
    ) -> Result<Vec<Incident>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM incidents \
             WHERE assigned_to = $1 AND resolved_at IS NOT NULL \
             ORDER BY resolved_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(volunteer_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
