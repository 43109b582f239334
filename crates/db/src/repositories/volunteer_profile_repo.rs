//! Repository for the `volunteer_profiles` table.

use sqlx::PgPool;

use rvois_core::types::DbId;

use crate::models::volunteer::VolunteerProfile;

/// Column list for `volunteer_profiles` queries.
const COLUMNS: &str = "user_id, full_name, phone_number, skills, is_available, \
    last_status_change, notes, created_at";

/// Provides access to volunteer profiles.
pub struct VolunteerProfileRepo;

impl VolunteerProfileRepo {
    /// Fetch a volunteer profile by user id.
    pub async fn get(pool: &PgPool, user_id: DbId) -> Result<Option<VolunteerProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM volunteer_profiles WHERE user_id = $1");
        sqlx::query_as::<_, VolunteerProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List every volunteer profile (aggregate-query input).
    pub async fn list_all(pool: &PgPool) -> Result<Vec<VolunteerProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM volunteer_profiles ORDER BY full_name");
        sqlx::query_as::<_, VolunteerProfile>(&query)
            .fetch_all(pool)
            .await
    }

    /// Flip the stored availability flag, stamping `last_status_change` and
    /// appending a timestamped reason line to the profile's notes.
    pub async fn set_availability(
        pool: &PgPool,
        user_id: DbId,
        is_available: bool,
        note_line: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE volunteer_profiles \
             SET is_available = $2, \
                 last_status_change = NOW(), \
                 notes = CASE \
                     WHEN notes IS NULL OR notes = '' THEN $3 \
                     ELSE notes || E'\\n' || $3 \
                 END \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(is_available)
        .bind(note_line)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
