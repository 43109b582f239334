//! Notification entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use rvois_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for creating a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub notification_type: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A row from the `notification_deliveries` table.
///
/// One row per (user, notification) pair. `attempt_count` is incremented on
/// every (re)send; `delivered_at` is set the first time the status reaches
/// `DELIVERED` and never regresses afterwards.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationDelivery {
    pub id: DbId,
    pub user_id: DbId,
    pub notification_id: DbId,
    pub status: String,
    pub attempt_count: i32,
    pub last_attempt_at: Timestamp,
    pub error_message: Option<String>,
    pub delivered_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A row from the `notification_read_status` table.
///
/// Unique on (notification, user); duplicate read events upsert rather than
/// creating additional rows.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationReadStatus {
    pub id: DbId,
    pub notification_id: DbId,
    pub user_id: DbId,
    pub read_via: String,
    pub read_at: Timestamp,
}

/// A row from the `notification_preferences` table.
///
/// Category flags are nullable: `NULL` means the category has never been
/// configured and defaults to enabled. Only an explicit `false` disables.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreference {
    pub id: DbId,
    pub user_id: DbId,
    pub push_enabled: bool,
    pub incident_alerts: Option<bool>,
    pub status_updates: Option<bool>,
    pub escalation_alerts: Option<bool>,
    pub training_reminders: Option<bool>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushSubscription {
    pub id: DbId,
    pub user_id: DbId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}
