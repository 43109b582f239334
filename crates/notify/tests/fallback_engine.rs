//! End-to-end escalation behavior: arm, fire, suppress, remind.
//!
//! Uses a recording SMS fake; countdowns are forced due by rewinding
//! `due_at`, then fired through a single sweep cycle.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use rvois_core::status::{fallback_event, fallback_stage, INCIDENT_ASSIGNED, INCIDENT_RESPONDING};
use rvois_core::types::DbId;
use rvois_db::repositories::{FallbackLogRepo, FallbackTaskRepo, IncidentViewRepo};
use rvois_notify::sms::SmsError;
use rvois_notify::{
    FallbackSweeper, LocalReferenceCodes, SmsContext, SmsGateway, SmsTemplate,
    VolunteerFallbackService,
};

/// One recorded send: (phone, template, params).
type SentSms = (String, SmsTemplate, serde_json::Value);

/// SMS fake that records sends and can be told to fail.
#[derive(Default)]
struct RecordingSms {
    sent: Mutex<Vec<SentSms>>,
    fail: Mutex<bool>,
}

impl RecordingSms {
    fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }

    fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send_sms(
        &self,
        phone_number: &str,
        template: SmsTemplate,
        params: &serde_json::Value,
        _context: &SmsContext,
    ) -> Result<(), SmsError> {
        if *self.fail.lock().unwrap() {
            return Err(SmsError::Gateway("provider rejected message".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone_number.to_string(), template, params.clone()));
        Ok(())
    }
}

fn service(pool: &PgPool, sms: &Arc<RecordingSms>) -> Arc<VolunteerFallbackService> {
    Arc::new(VolunteerFallbackService::new(
        pool.clone(),
        sms.clone(),
        Arc::new(LocalReferenceCodes),
    ))
}

async fn seed_volunteer(pool: &PgPool, phone: Option<&str>) -> DbId {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO volunteer_profiles (user_id, full_name, phone_number) VALUES ($1, $2, $3)",
    )
    .bind(id)
    .bind("Juan Dela Cruz")
    .bind(phone)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_assigned_incident(pool: &PgPool, volunteer_id: DbId) -> DbId {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO incidents (id, incident_type, barangay, status, assigned_to, assigned_at) \
         VALUES ($1, 'FIRE', 'Poblacion', $2, $3, NOW())",
    )
    .bind(id)
    .bind(INCIDENT_ASSIGNED)
    .bind(volunteer_id)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn force_due(pool: &PgPool, incident_id: DbId) {
    sqlx::query("UPDATE fallback_tasks SET due_at = NOW() - interval '1 second' WHERE incident_id = $1")
        .bind(incident_id)
        .execute(pool)
        .await
        .unwrap();
}

async fn event_types(pool: &PgPool, incident_id: DbId) -> Vec<String> {
    FallbackLogRepo::list_for_incident(pool, incident_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_start_leaves_exactly_one_pending_countdown(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    service.start_monitoring(incident, volunteer).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fallback_tasks WHERE incident_id = $1")
        .bind(incident)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // Fire it: exactly one SMS despite the double start.
    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;
    assert_eq!(sms.sent().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_phone_number_aborts_monitoring(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, None).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;

    assert!(FallbackTaskRepo::get_for_incident(&pool, incident)
        .await
        .unwrap()
        .is_none());
    assert!(event_types(&pool, incident).await.is_empty());
    assert!(sms.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fallback_fires_and_arms_reminder(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;

    let sent = sms.sent();
    assert_eq!(sent.len(), 1);
    let (phone, template, params) = &sent[0];
    assert_eq!(phone, "09171234567");
    assert_eq!(*template, SmsTemplate::VolunteerFallback);
    assert_eq!(params["incident_type"], "FIRE");
    assert_eq!(params["barangay"], "Poblacion");

    let events = event_types(&pool, incident).await;
    assert_eq!(
        events,
        vec![fallback_event::MONITORING_STARTED, fallback_event::SMS_FALLBACK_SENT]
    );

    // The reminder tier is armed roughly five minutes out.
    let task = FallbackTaskRepo::get_for_incident(&pool, incident)
        .await
        .unwrap()
        .expect("reminder task armed");
    assert_eq!(task.stage, fallback_stage::REMINDER);
    let minutes_out = (task.due_at - Utc::now()).num_minutes();
    assert!((4..=5).contains(&minutes_out), "due {minutes_out} min out");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_change_suppresses_fallback(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    sqlx::query("UPDATE incidents SET status = $1 WHERE id = $2")
        .bind(INCIDENT_RESPONDING)
        .bind(incident)
        .execute(&pool)
        .await
        .unwrap();

    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;

    assert!(sms.sent().is_empty());
    // No reminder armed either.
    assert!(FallbackTaskRepo::get_for_incident(&pool, incident)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reassignment_suppresses_fallback(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let other = seed_volunteer(&pool, Some("09179998877")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    sqlx::query("UPDATE incidents SET assigned_to = $1 WHERE id = $2")
        .bind(other)
        .bind(incident)
        .execute(&pool)
        .await
        .unwrap();

    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;

    assert!(sms.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recent_view_signal_suppresses_fallback(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    IncidentViewRepo::record(&pool, incident, volunteer).await.unwrap();

    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;

    assert!(sms.sent().is_empty(), "viewed incidents must not escalate");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_view_signal_does_not_suppress(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    sqlx::query(
        "INSERT INTO incident_views (incident_id, user_id, viewed_at) \
         VALUES ($1, $2, NOW() - interval '10 minutes')",
    )
    .bind(incident)
    .bind(volunteer)
    .execute(&pool)
    .await
    .unwrap();

    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;

    assert_eq!(sms.sent().len(), 1, "a view outside the window is no acknowledgment");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn late_acknowledgment_suppresses_reminder(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;
    let sweeper =
        FallbackSweeper::with_interval(pool.clone(), service.clone(), std::time::Duration::from_secs(5));

    service.start_monitoring(incident, volunteer).await;
    force_due(&pool, incident).await;
    sweeper.sweep_once().await;
    assert_eq!(sms.sent().len(), 1);

    // Assignee acknowledges between the fallback and the reminder.
    sqlx::query("UPDATE incidents SET status = $1 WHERE id = $2")
        .bind(INCIDENT_RESPONDING)
        .bind(incident)
        .execute(&pool)
        .await
        .unwrap();

    force_due(&pool, incident).await;
    sweeper.sweep_once().await;

    assert_eq!(sms.sent().len(), 1, "no reminder after acknowledgment");
    let events = event_types(&pool, incident).await;
    assert!(!events.contains(&fallback_event::REMINDER_SENT.to_string()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unacknowledged_reminder_fires(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;
    let sweeper =
        FallbackSweeper::with_interval(pool.clone(), service.clone(), std::time::Duration::from_secs(5));

    service.start_monitoring(incident, volunteer).await;
    force_due(&pool, incident).await;
    sweeper.sweep_once().await;
    force_due(&pool, incident).await;
    sweeper.sweep_once().await;

    let sent = sms.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].1, SmsTemplate::VolunteerReminder);

    let events = event_types(&pool, incident).await;
    assert_eq!(
        events,
        vec![
            fallback_event::MONITORING_STARTED,
            fallback_event::SMS_FALLBACK_SENT,
            fallback_event::REMINDER_SENT,
        ]
    );

    // No escalation tier beyond the reminder.
    assert!(FallbackTaskRepo::get_for_incident(&pool, incident)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn gateway_failure_is_logged_and_stops_the_chain(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    sms.set_fail(true);
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;

    let events = event_types(&pool, incident).await;
    assert_eq!(
        events,
        vec![fallback_event::MONITORING_STARTED, fallback_event::SMS_FALLBACK_FAILED]
    );
    // A failed fallback does not arm the reminder tier.
    assert!(FallbackTaskRepo::get_for_incident(&pool, incident)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stop_monitoring_cancels_and_logs(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(incident, volunteer).await;
    service.stop_monitoring(incident, "incident resolved").await;

    assert!(FallbackTaskRepo::get_for_incident(&pool, incident)
        .await
        .unwrap()
        .is_none());

    let events = event_types(&pool, incident).await;
    assert_eq!(
        events,
        vec![fallback_event::MONITORING_STARTED, fallback_event::MONITORING_STOPPED]
    );

    // Stopping an unmonitored incident still succeeds.
    service.stop_monitoring(incident, "duplicate stop").await;

    // Nothing ever fires.
    force_due(&pool, incident).await;
    FallbackSweeper::with_interval(pool.clone(), service, std::time::Duration::from_secs(5))
        .sweep_once()
        .await;
    assert!(sms.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_incident_or_volunteer_is_a_noop(pool: PgPool) {
    let sms = Arc::new(RecordingSms::default());
    let service = service(&pool, &sms);
    let volunteer = seed_volunteer(&pool, Some("09171234567")).await;
    let incident = seed_assigned_incident(&pool, volunteer).await;

    service.start_monitoring(Uuid::new_v4(), volunteer).await;
    service.start_monitoring(incident, Uuid::new_v4()).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fallback_tasks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
