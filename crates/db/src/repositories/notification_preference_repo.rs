//! Repository for the `notification_preferences` table.

use sqlx::PgPool;

use rvois_core::types::DbId;

use crate::models::notification::NotificationPreference;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "id, user_id, push_enabled, incident_alerts, status_updates, \
    escalation_alerts, training_reminders, created_at, updated_at";

/// Provides read access to per-user notification preferences.
///
/// Preference rows are optional: a user with no row gets every category
/// delivered (opt-out, not opt-in). Writes go through the CRUD layer.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Get the preference row for a user, if one exists.
    pub async fn get_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationPreference>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1");
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
