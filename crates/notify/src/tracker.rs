//! Notification delivery tracking and the preference gate.
//!
//! [`NotificationDeliveryService`] is the best-effort audit trail around
//! every notification send: it records per-(user, notification) delivery
//! attempts, read receipts across channels, and gates sends on the user's
//! preference row. None of its operations propagate errors — a notification
//! side effect must never take down the business operation that triggered
//! it, so every failure is logged and converted to a neutral return value.

use std::sync::Arc;

use rvois_core::status::{category, delivery};
use rvois_core::types::DbId;
use rvois_core::CoreError;
use rvois_db::models::notification::{NewNotification, Notification, NotificationPreference};
use rvois_db::repositories::{
    NotificationDeliveryRepo, NotificationPreferenceRepo, NotificationReadStatusRepo,
    NotificationRepo, PushSubscriptionRepo,
};
use rvois_db::DbPool;

use crate::push::{PushError, PushNotifier, PushPayload};

/// Records delivery/read state and performs tracked push sends.
pub struct NotificationDeliveryService {
    pool: DbPool,
    push: Arc<PushNotifier>,
}

impl NotificationDeliveryService {
    /// Create a service over the shared pool and push notifier.
    pub fn new(pool: DbPool, push: Arc<PushNotifier>) -> Self {
        Self { pool, push }
    }

    /// Record a delivery attempt for a (user, notification) pair.
    ///
    /// Upserts the delivery row: first call inserts with attempt count 1,
    /// repeats increment the counter and replace status/error.
    /// Best-effort — storage failures are logged, never raised.
    pub async fn track_delivery(
        &self,
        user_id: DbId,
        notification_id: DbId,
        status: &str,
        error_message: Option<&str>,
    ) {
        if let Err(e) = NotificationDeliveryRepo::record_attempt(
            &self.pool,
            user_id,
            notification_id,
            status,
            error_message,
        )
        .await
        {
            tracing::error!(
                %user_id,
                %notification_id,
                status,
                error = %e,
                "Failed to track delivery attempt"
            );
        }
    }

    /// Record that a user read a notification via the given channel.
    ///
    /// Three coordinated, independently best-effort writes: the delivery
    /// row's read stamp, the read-status upsert (idempotent on repeats),
    /// and the primary notification record's `read_at`.
    pub async fn mark_as_read(&self, notification_id: DbId, user_id: DbId, read_via: &str) {
        if let Err(e) =
            NotificationDeliveryRepo::mark_read(&self.pool, notification_id, user_id).await
        {
            tracing::error!(%notification_id, %user_id, error = %e, "Failed to mark delivery read");
        }

        if let Err(e) =
            NotificationReadStatusRepo::upsert(&self.pool, notification_id, user_id, read_via).await
        {
            tracing::error!(%notification_id, %user_id, error = %e, "Failed to upsert read status");
        }

        if let Err(e) = NotificationRepo::mark_read(&self.pool, notification_id, user_id).await {
            tracing::error!(%notification_id, %user_id, error = %e, "Failed to stamp notification read_at");
        }
    }

    /// All unread notifications for a user, newest first.
    ///
    /// Fail-open for the UI: returns an empty list on any error.
    pub async fn get_unread_notifications(&self, user_id: DbId) -> Vec<Notification> {
        match NotificationRepo::list_unread(&self.pool, user_id).await {
            Ok(notifications) => notifications,
            Err(e) => {
                tracing::error!(%user_id, error = %e, "Failed to load unread notifications");
                Vec::new()
            }
        }
    }

    /// Whether a notification of the given category may be sent to the user.
    ///
    /// Opt-out, not opt-in: no preference row, an unknown category, or any
    /// read error all default to `true`. An explicit `push_enabled = false`
    /// short-circuits everything; otherwise only an explicit `false` on the
    /// category flag blocks the send.
    pub async fn check_notification_preferences(
        &self,
        user_id: DbId,
        notification_type: &str,
    ) -> bool {
        let pref = match NotificationPreferenceRepo::get_for_user(&self.pool, user_id).await {
            Ok(pref) => pref,
            Err(e) => {
                tracing::error!(%user_id, error = %e, "Failed to read notification preferences");
                return true;
            }
        };

        match pref {
            None => true,
            Some(pref) => preference_allows(&pref, notification_type),
        }
    }

    /// Composite tracked send: preference gate, notification insert, push
    /// attempt, delivery bookkeeping.
    ///
    /// Returns the created notification id. The send is recorded as `SENT`
    /// or `FAILED` (with error detail); a push failure still returns the id,
    /// since the notification exists and the failure is in the audit trail.
    pub async fn send_notification_with_tracking(
        &self,
        user_id: DbId,
        notification: &NewNotification,
    ) -> Result<DbId, CoreError> {
        if !self
            .check_notification_preferences(user_id, &notification.notification_type)
            .await
        {
            return Err(CoreError::NotificationsDisabled {
                user_id,
                category: notification.notification_type.clone(),
            });
        }

        let notification_id = NotificationRepo::create(&self.pool, user_id, notification)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to create notification: {e}")))?;

        self.track_delivery(user_id, notification_id, delivery::PENDING, None)
            .await;

        let subscriptions =
            match PushSubscriptionRepo::list_active_for_user(&self.pool, user_id).await {
                Ok(subs) => subs,
                Err(e) => {
                    tracing::error!(%user_id, error = %e, "Failed to load push subscriptions");
                    Vec::new()
                }
            };

        let Some(subscription) = subscriptions.first() else {
            self.track_delivery(
                user_id,
                notification_id,
                delivery::FAILED,
                Some("No active push subscription"),
            )
            .await;
            return Ok(notification_id);
        };

        let payload = PushPayload::new(&notification.title, &notification.body)
            .with_data(notification.data.clone());

        match self.push.send(subscription, &payload).await {
            Ok(()) => {
                self.track_delivery(user_id, notification_id, delivery::SENT, None)
                    .await;
            }
            Err(e) => {
                if let PushError::EndpointGone(_) = e {
                    if let Err(de) =
                        PushSubscriptionRepo::deactivate(&self.pool, subscription.id).await
                    {
                        tracing::error!(
                            subscription_id = %subscription.id,
                            error = %de,
                            "Failed to deactivate dead push subscription"
                        );
                    }
                }
                let message = e.to_string();
                tracing::warn!(%user_id, %notification_id, error = %message, "Push send failed");
                self.track_delivery(user_id, notification_id, delivery::FAILED, Some(&message))
                    .await;
            }
        }

        Ok(notification_id)
    }
}

/// Decide whether a preference row allows a notification category.
fn preference_allows(pref: &NotificationPreference, notification_type: &str) -> bool {
    if !pref.push_enabled {
        return false;
    }

    let flag = match notification_type {
        category::INCIDENT_ALERTS => pref.incident_alerts,
        category::STATUS_UPDATES => pref.status_updates,
        category::ESCALATION_ALERTS => pref.escalation_alerts,
        category::TRAINING_REMINDERS => pref.training_reminders,
        _ => None,
    };

    // Absent flag means the category was never configured: enabled.
    flag != Some(false)
}
