//! Repository for the `fallback_tasks` scheduled-task table.
//!
//! The table holds at most one pending escalation per incident (unique on
//! `incident_id`). Scheduling replaces any existing row, claiming deletes due
//! rows under `FOR UPDATE SKIP LOCKED` so concurrent sweepers never
//! double-fire a task.

use sqlx::PgPool;

use rvois_core::types::{DbId, Timestamp};

use crate::models::fallback::FallbackTask;

/// Column list for `fallback_tasks` queries.
const COLUMNS: &str = "id, incident_id, volunteer_id, stage, due_at, reference_code, created_at";

/// Persistent store of pending fallback/reminder escalations.
pub struct FallbackTaskRepo;

impl FallbackTaskRepo {
    /// Schedule (or replace) the pending escalation for an incident.
    ///
    /// `ON CONFLICT (incident_id) DO UPDATE` gives cancel-before-re-arm in a
    /// single statement: a duplicate start, or advancing from the fallback
    /// stage to the reminder stage, supersedes whatever was pending.
    pub async fn schedule(
        pool: &PgPool,
        incident_id: DbId,
        volunteer_id: DbId,
        stage: &str,
        due_at: Timestamp,
        reference_code: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO fallback_tasks (incident_id, volunteer_id, stage, due_at, reference_code) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (incident_id) DO UPDATE SET \
                 volunteer_id = EXCLUDED.volunteer_id, \
                 stage = EXCLUDED.stage, \
                 due_at = EXCLUDED.due_at, \
                 reference_code = EXCLUDED.reference_code, \
                 created_at = NOW() \
             RETURNING id",
        )
        .bind(incident_id)
        .bind(volunteer_id)
        .bind(stage)
        .bind(due_at)
        .bind(reference_code)
        .fetch_one(pool)
        .await
    }

    /// Cancel the pending escalation for an incident, if any.
    ///
    /// Returns `true` if a task was pending and has been removed. A task
    /// already claimed by a sweeper is gone from the table and cannot be
    /// cancelled mid-flight; the sweeper's own state re-check is the guard
    /// at that point.
    pub async fn cancel(pool: &PgPool, incident_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM fallback_tasks WHERE incident_id = $1")
            .bind(incident_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim up to `limit` tasks whose `due_at` has passed.
    ///
    /// Claiming deletes the rows, so each task fires at most once; the
    /// `FOR UPDATE SKIP LOCKED` subquery keeps concurrent sweep cycles from
    /// claiming the same task.
    pub async fn claim_due(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<FallbackTask>, sqlx::Error> {
        let query = format!(
            "DELETE FROM fallback_tasks \
             WHERE id IN ( \
                 SELECT id FROM fallback_tasks \
                 WHERE due_at <= $1 \
                 ORDER BY due_at \
                 LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FallbackTask>(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Fetch the pending task for an incident, if any (used by tests and
    /// operational inspection).
    pub async fn get_for_incident(
        pool: &PgPool,
        incident_id: DbId,
    ) -> Result<Option<FallbackTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM fallback_tasks WHERE incident_id = $1");
        sqlx::query_as::<_, FallbackTask>(&query)
            .bind(incident_id)
            .fetch_optional(pool)
            .await
    }
}
