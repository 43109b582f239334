//! Fallback escalation models: the audit log and the scheduled-task store.

use serde::Serialize;
use sqlx::FromRow;

use rvois_core::types::{DbId, Timestamp};

/// A row from the append-only `volunteer_fallback_logs` audit table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FallbackLogEntry {
    pub id: DbId,
    pub incident_id: DbId,
    pub volunteer_id: Option<DbId>,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// A row from the `fallback_tasks` scheduled-task table.
///
/// One pending escalation per incident (unique on `incident_id`). The sweep
/// loop claims rows whose `due_at` has passed and runs the check-and-escalate
/// logic; claiming deletes the row, so a task fires at most once. Because the
/// store is persistent, in-flight countdowns survive process restarts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FallbackTask {
    pub id: DbId,
    pub incident_id: DbId,
    pub volunteer_id: DbId,
    /// Escalation stage to execute when due: `FALLBACK` or `REMINDER`.
    pub stage: String,
    pub due_at: Timestamp,
    /// Human-readable incident reference code resolved at monitoring start,
    /// carried along so the SMS body does not depend on the reference-code
    /// service being up at fire time.
    pub reference_code: String,
    pub created_at: Timestamp,
}
