//! Volunteer fallback escalation.
//!
//! Every incident assignment must be acknowledged by its assignee within a
//! bounded time. [`VolunteerFallbackService`] arms a persistent countdown
//! when monitoring starts; if the assignee has not acknowledged when it
//! fires, an SMS fallback goes out and a reminder is armed; if that fires
//! unacknowledged too, a reminder SMS goes out. Acknowledgment is any of:
//! the incident status moving off `ASSIGNED`, reassignment to a different
//! volunteer, or a recorded view of the incident by the assignee within the
//! last two minutes.
//!
//! Countdowns live in the `fallback_tasks` table, not in process memory, so
//! they survive restarts; [`crate::sweeper::FallbackSweeper`] claims due
//! tasks and calls back into [`VolunteerFallbackService::execute_task`].
//! Once a task has been claimed it cannot be cancelled mid-flight — the
//! handler's own re-read of incident state is the only guard against a
//! stale escalation.
//!
//! Every public operation is called from background/event contexts with no
//! user waiting: none of them return errors. Failures are logged to the
//! process log and, for escalation outcomes, to `volunteer_fallback_logs`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use rvois_core::status::{fallback_event, fallback_stage, INCIDENT_ASSIGNED};
use rvois_core::types::DbId;
use rvois_db::models::fallback::FallbackTask;
use rvois_db::models::incident::Incident;
use rvois_db::repositories::{
    FallbackLogRepo, FallbackTaskRepo, IncidentRepo, IncidentViewRepo, VolunteerProfileRepo,
};
use rvois_db::DbPool;

use crate::reference::{local_reference_code, ReferenceCodes};
use crate::sms::{SmsContext, SmsGateway, SmsTemplate};

/// Countdown between assignment and the SMS fallback.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Countdown between a successful SMS fallback and the reminder.
pub const REMINDER_DELAY: Duration = Duration::from_secs(5 * 60);

/// A view of the incident within this window counts as acknowledgment.
pub const VIEW_ACK_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Escalates unacknowledged incident assignments through SMS.
pub struct VolunteerFallbackService {
    pool: DbPool,
    sms: Arc<dyn SmsGateway>,
    reference_codes: Arc<dyn ReferenceCodes>,
}

impl VolunteerFallbackService {
    /// Create a service over the shared pool and gateway clients.
    pub fn new(
        pool: DbPool,
        sms: Arc<dyn SmsGateway>,
        reference_codes: Arc<dyn ReferenceCodes>,
    ) -> Self {
        Self {
            pool,
            sms,
            reference_codes,
        }
    }

    /// Begin monitoring an incident assignment.
    ///
    /// Replaces any escalation already pending for this incident (duplicate
    /// starts and quick reassignments therefore never double-fire), resolves
    /// a reference code, and arms the fallback countdown. No-op with a
    /// logged warning if the incident or volunteer cannot be loaded or the
    /// volunteer has no phone number on file.
    pub async fn start_monitoring(&self, incident_id: DbId, volunteer_id: DbId) {
        let incident = match IncidentRepo::get(&self.pool, incident_id).await {
            Ok(Some(incident)) => incident,
            Ok(None) => {
                tracing::warn!(%incident_id, "Fallback monitoring skipped: incident not found");
                return;
            }
            Err(e) => {
                tracing::error!(%incident_id, error = %e, "Fallback monitoring skipped: incident load failed");
                return;
            }
        };

        let profile = match VolunteerProfileRepo::get(&self.pool, volunteer_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(%incident_id, %volunteer_id, "Fallback monitoring skipped: volunteer not found");
                return;
            }
            Err(e) => {
                tracing::error!(%volunteer_id, error = %e, "Fallback monitoring skipped: volunteer load failed");
                return;
            }
        };

        if profile.phone_number.as_deref().unwrap_or("").is_empty() {
            tracing::warn!(
                %incident_id,
                %volunteer_id,
                "Fallback monitoring skipped: volunteer has no phone number"
            );
            return;
        }

        let reference_code = self.resolve_reference_code(incident_id).await;
        let due_at = Utc::now() + chrono::Duration::seconds(FALLBACK_TIMEOUT.as_secs() as i64);

        if let Err(e) = FallbackTaskRepo::schedule(
            &self.pool,
            incident_id,
            volunteer_id,
            fallback_stage::FALLBACK,
            due_at,
            &reference_code,
        )
        .await
        {
            tracing::error!(%incident_id, error = %e, "Failed to arm fallback countdown");
            return;
        }

        self.log_event(
            incident_id,
            Some(volunteer_id),
            fallback_event::MONITORING_STARTED,
            serde_json::json!({
                "reference_id": reference_code,
                "timeout_secs": FALLBACK_TIMEOUT.as_secs(),
                "incident_type": incident.incident_type,
            }),
        )
        .await;

        tracing::info!(
            %incident_id,
            %volunteer_id,
            reference_code,
            timeout_secs = FALLBACK_TIMEOUT.as_secs(),
            "Fallback monitoring started"
        );
    }

    /// Stop monitoring an incident, cancelling any pending escalation.
    ///
    /// Always succeeds; a no-op if nothing was being monitored.
    pub async fn stop_monitoring(&self, incident_id: DbId, reason: &str) {
        let cancelled = match FallbackTaskRepo::cancel(&self.pool, incident_id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                tracing::error!(%incident_id, error = %e, "Failed to cancel fallback task");
                false
            }
        };

        self.log_event(
            incident_id,
            None,
            fallback_event::MONITORING_STOPPED,
            serde_json::json!({ "reason": reason, "cancelled_pending": cancelled }),
        )
        .await;

        tracing::info!(%incident_id, reason, cancelled, "Fallback monitoring stopped");
    }

    /// Execute a claimed escalation task.
    ///
    /// Dispatches on the task's stage. All failures are contained here: the
    /// task has already fired and is gone from the store, so nothing is
    /// re-armed on error.
    pub async fn execute_task(&self, task: &FallbackTask) {
        match task.stage.as_str() {
            fallback_stage::FALLBACK => self.run_fallback(task).await,
            fallback_stage::REMINDER => self.run_reminder(task).await,
            other => {
                tracing::error!(%task.incident_id, stage = other, "Unknown fallback stage, dropping task");
            }
        }
    }

    /// First escalation tier: SMS fallback after the initial countdown.
    async fn run_fallback(&self, task: &FallbackTask) {
        // Assignment state may have moved since the countdown was armed;
        // trust only a fresh read.
        let Some(incident) = self.load_if_still_assigned(task).await else {
            return;
        };

        match self.viewed_recently(task).await {
            Ok(true) => {
                tracing::debug!(
                    incident_id = %task.incident_id,
                    "Assignee viewed the incident recently, skipping SMS fallback"
                );
                return;
            }
            Ok(false) => {}
            Err(e) => {
                // Assume no signal and escalate; better a redundant SMS
                // than a missed incident.
                tracing::error!(incident_id = %task.incident_id, error = %e, "View-signal check failed");
            }
        }

        let Some(phone_number) = self.load_phone_number(task).await else {
            self.log_event(
                task.incident_id,
                Some(task.volunteer_id),
                fallback_event::SMS_FALLBACK_FAILED,
                serde_json::json!({
                    "reference_id": task.reference_code,
                    "error": "volunteer has no phone number",
                }),
            )
            .await;
            return;
        };

        let params = serde_json::json!({
            "reference": task.reference_code,
            "incident_type": incident.incident_type,
            "barangay": incident.barangay,
            "assigned_at": incident.assigned_at,
        });
        let context = SmsContext {
            incident_id: task.incident_id,
            reference_code: task.reference_code.clone(),
            triggered_by: "fallback_timeout",
            recipient_user_id: task.volunteer_id,
        };

        match self
            .sms
            .send_sms(&phone_number, SmsTemplate::VolunteerFallback, &params, &context)
            .await
        {
            Ok(()) => {
                self.log_event(
                    task.incident_id,
                    Some(task.volunteer_id),
                    fallback_event::SMS_FALLBACK_SENT,
                    serde_json::json!({
                        "reference_id": task.reference_code,
                        "template": SmsTemplate::VolunteerFallback.code(),
                    }),
                )
                .await;

                // Arm the reminder tier. `schedule` replaces any row still
                // pending for this incident, so reminders never duplicate.
                let due_at =
                    Utc::now() + chrono::Duration::seconds(REMINDER_DELAY.as_secs() as i64);
                if let Err(e) = FallbackTaskRepo::schedule(
                    &self.pool,
                    task.incident_id,
                    task.volunteer_id,
                    fallback_stage::REMINDER,
                    due_at,
                    &task.reference_code,
                )
                .await
                {
                    tracing::error!(
                        incident_id = %task.incident_id,
                        error = %e,
                        "Failed to arm reminder countdown"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    incident_id = %task.incident_id,
                    error = %e,
                    "SMS fallback send failed"
                );
                self.log_event(
                    task.incident_id,
                    Some(task.volunteer_id),
                    fallback_event::SMS_FALLBACK_FAILED,
                    serde_json::json!({
                        "reference_id": task.reference_code,
                        "error": e.to_string(),
                    }),
                )
                .await;
                // No reminder tier after a failed fallback.
            }
        }
    }

    /// Second escalation tier: reminder SMS. Same assignment re-check as the
    /// fallback tier, but no view-signal check at this stage.
    async fn run_reminder(&self, task: &FallbackTask) {
        let Some(incident) = self.load_if_still_assigned(task).await else {
            return;
        };

        let Some(phone_number) = self.load_phone_number(task).await else {
            return;
        };

        let params = serde_json::json!({
            "reference": task.reference_code,
            "incident_type": incident.incident_type,
            "barangay": incident.barangay,
            "assigned_at": incident.assigned_at,
        });
        let context = SmsContext {
            incident_id: task.incident_id,
            reference_code: task.reference_code.clone(),
            triggered_by: "reminder_timeout",
            recipient_user_id: task.volunteer_id,
        };

        match self
            .sms
            .send_sms(&phone_number, SmsTemplate::VolunteerReminder, &params, &context)
            .await
        {
            Ok(()) => {
                self.log_event(
                    task.incident_id,
                    Some(task.volunteer_id),
                    fallback_event::REMINDER_SENT,
                    serde_json::json!({
                        "reference_id": task.reference_code,
                        "template": SmsTemplate::VolunteerReminder.code(),
                    }),
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(
                    incident_id = %task.incident_id,
                    error = %e,
                    "Reminder SMS send failed"
                );
                self.log_event(
                    task.incident_id,
                    Some(task.volunteer_id),
                    fallback_event::SMS_FALLBACK_FAILED,
                    serde_json::json!({
                        "reference_id": task.reference_code,
                        "stage": fallback_stage::REMINDER,
                        "error": e.to_string(),
                    }),
                )
                .await;
            }
        }
        // No further escalation beyond the reminder tier.
    }

    /// Re-read the incident and return it only if the original assignment is
    /// still awaiting acknowledgment. Any mismatch (missing, reassigned,
    /// status advanced) aborts silently — that is acknowledgment, not error.
    async fn load_if_still_assigned(&self, task: &FallbackTask) -> Option<Incident> {
        let incident = match IncidentRepo::get(&self.pool, task.incident_id).await {
            Ok(Some(incident)) => incident,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(incident_id = %task.incident_id, error = %e, "Incident re-read failed");
                return None;
            }
        };

        if incident.status != INCIDENT_ASSIGNED || incident.assigned_to != Some(task.volunteer_id) {
            tracing::debug!(
                incident_id = %task.incident_id,
                status = %incident.status,
                "Assignment acknowledged or superseded, skipping escalation"
            );
            return None;
        }

        Some(incident)
    }

    /// Whether the assignee viewed the incident within the acknowledgment
    /// window.
    async fn viewed_recently(&self, task: &FallbackTask) -> Result<bool, sqlx::Error> {
        let since = Utc::now() - chrono::Duration::seconds(VIEW_ACK_WINDOW.as_secs() as i64);
        IncidentViewRepo::viewed_since(&self.pool, task.incident_id, task.volunteer_id, since).await
    }

    /// Load the assignee's phone number, if still on file.
    async fn load_phone_number(&self, task: &FallbackTask) -> Option<String> {
        match VolunteerProfileRepo::get(&self.pool, task.volunteer_id).await {
            Ok(Some(profile)) => profile.phone_number.filter(|p| !p.is_empty()),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(volunteer_id = %task.volunteer_id, error = %e, "Volunteer load failed");
                None
            }
        }
    }

    /// Resolve the canonical reference code, falling back to the locally
    /// derived short code when the lookup service is unavailable.
    async fn resolve_reference_code(&self, incident_id: DbId) -> String {
        match self.reference_codes.reference_id(incident_id).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(
                    %incident_id,
                    error = %e,
                    "Reference service unavailable, using derived code"
                );
                local_reference_code(incident_id)
            }
        }
    }

    /// Append to the fallback audit log; failures are logged, never raised.
    async fn log_event(
        &self,
        incident_id: DbId,
        volunteer_id: Option<DbId>,
        event_type: &str,
        metadata: serde_json::Value,
    ) {
        if let Err(e) =
            FallbackLogRepo::insert(&self.pool, incident_id, volunteer_id, event_type, metadata)
                .await
        {
            tracing::error!(%incident_id, event_type, error = %e, "Failed to write fallback log");
        }
    }
}
