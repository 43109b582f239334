//! Incident entity models.

use serde::Serialize;
use sqlx::FromRow;

use rvois_core::types::{DbId, Timestamp};

/// A row from the `incidents` table.
///
/// The incident table is owned by the CRUD layer; the fallback engine only
/// reads assignment/status fields and treats them as potentially stale,
/// re-validating immediately before any escalation action.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Incident {
    pub id: DbId,
    pub incident_type: String,
    pub barangay: String,
    pub status: String,
    pub assigned_to: Option<DbId>,
    pub assigned_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// A row from the `incident_views` table: "user viewed incident X at time T".
///
/// Used by the fallback engine only as an existence-within-window check.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IncidentView {
    pub id: DbId,
    pub incident_id: DbId,
    pub user_id: DbId,
    pub viewed_at: Timestamp,
}
