//! Volunteer profile and availability-audit models.

use serde::Serialize;
use sqlx::FromRow;

use rvois_core::types::{DbId, Timestamp};

/// A row from the `volunteer_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VolunteerProfile {
    pub user_id: DbId,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub skills: Vec<String>,
    pub is_available: bool,
    pub last_status_change: Timestamp,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// A row from the `volunteer_availability_log` audit table.
///
/// One row per availability flip, capturing the before/after boolean and the
/// reason the change was made. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailabilityLogEntry {
    pub id: DbId,
    pub volunteer_id: DbId,
    pub previous_status: bool,
    pub new_status: bool,
    pub reason: String,
    pub created_at: Timestamp,
}
