//! Repository for the `push_subscriptions` table.

use sqlx::PgPool;

use rvois_core::types::DbId;

use crate::models::notification::PushSubscription;

/// Column list for `push_subscriptions` queries.
const COLUMNS: &str = "id, user_id, endpoint, p256dh, auth, is_active, created_at";

/// Provides access to registered push-subscription endpoints.
pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// List active subscriptions for a user, oldest registration first.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE user_id = $1 AND is_active = true \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Mark a subscription inactive (endpoint gone, e.g. HTTP 404/410).
    pub async fn deactivate(pool: &PgPool, subscription_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE push_subscriptions SET is_active = false WHERE id = $1")
            .bind(subscription_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
