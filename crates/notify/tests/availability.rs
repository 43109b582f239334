//! Availability recalculation against a real database.

use sqlx::PgPool;
use uuid::Uuid;

use rvois_core::status::{INCIDENT_ASSIGNED, INCIDENT_RESOLVED};
use rvois_core::types::DbId;
use rvois_db::repositories::AvailabilityLogRepo;
use rvois_notify::VolunteerAvailabilityService;

async fn seed_volunteer(pool: &PgPool, skills: &[&str], available: bool) -> DbId {
    let id = Uuid::new_v4();
    let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
    sqlx::query(
        "INSERT INTO volunteer_profiles (user_id, full_name, phone_number, skills, is_available) \
         VALUES ($1, 'Maria Santos', '09181112222', $2, $3)",
    )
    .bind(id)
    .bind(&skills)
    .bind(available)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_open_incident(pool: &PgPool, volunteer_id: DbId) -> DbId {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO incidents (id, incident_type, barangay, status, assigned_to, assigned_at) \
         VALUES ($1, 'FLOOD', 'San Isidro', $2, $3, NOW())",
    )
    .bind(id)
    .bind(INCIDENT_ASSIGNED)
    .bind(volunteer_id)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_resolved_incident(pool: &PgPool, volunteer_id: DbId, minutes_to_resolve: i64) {
    sqlx::query(
        "INSERT INTO incidents \
             (incident_type, barangay, status, assigned_to, assigned_at, created_at, resolved_at) \
         VALUES ('FLOOD', 'San Isidro', $1, $2, NOW() - make_interval(mins => $3), \
                 NOW() - make_interval(mins => $3), NOW())",
    )
    .bind(INCIDENT_RESOLVED)
    .bind(volunteer_id)
    .bind(minutes_to_resolve as i32)
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_reflects_open_count_against_capacity(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    let volunteer = seed_volunteer(&pool, &[], true).await;

    let availability = service.get_volunteer_availability(volunteer).await.unwrap();
    assert!(availability.is_available);
    assert_eq!(availability.open_assignments, 0);
    assert_eq!(availability.max_assignments, 2);
    assert!(availability.estimated_available_at.is_none());

    seed_open_incident(&pool, volunteer).await;
    let availability = service.get_volunteer_availability(volunteer).await.unwrap();
    assert!(availability.is_available, "one of two slots used");
    assert!(availability.estimated_available_at.is_some());

    seed_open_incident(&pool, volunteer).await;
    let availability = service.get_volunteer_availability(volunteer).await.unwrap();
    assert!(!availability.is_available, "both slots used");
    assert_eq!(availability.open_assignments, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn skills_raise_capacity(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    let volunteer = seed_volunteer(&pool, &["LEADERSHIP", "MEDICAL PROFESSIONAL"], true).await;

    let availability = service.get_volunteer_availability(volunteer).await.unwrap();
    assert_eq!(availability.max_assignments, 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_volunteer_returns_none(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    assert!(service.get_volunteer_availability(Uuid::new_v4()).await.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn estimate_projects_from_resolution_history(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    let volunteer = seed_volunteer(&pool, &[], true).await;
    seed_resolved_incident(&pool, volunteer, 30).await;
    seed_resolved_incident(&pool, volunteer, 90).await;
    seed_open_incident(&pool, volunteer).await;

    let availability = service.get_volunteer_availability(volunteer).await.unwrap();
    let eta = availability.estimated_available_at.unwrap();
    // mean(30, 90) = 60 minutes x 1 open assignment.
    let minutes_out = (eta - chrono::Utc::now()).num_minutes();
    assert!((58..=61).contains(&minutes_out), "eta {minutes_out} min out");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_read_failure_yields_no_answer(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    let volunteer = seed_volunteer(&pool, &[], true).await;
    seed_open_incident(&pool, volunteer).await;

    // Break only the resolution-history query: the count queries never
    // touch this column, so the lookup fails exactly at the history read.
    sqlx::query("ALTER TABLE incidents DROP COLUMN barangay")
        .execute(&pool)
        .await
        .unwrap();

    assert!(service.get_volunteer_availability(volunteer).await.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_flips_at_capacity_with_audit_row(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    let volunteer = seed_volunteer(&pool, &[], true).await;
    seed_open_incident(&pool, volunteer).await;
    let second = seed_open_incident(&pool, volunteer).await;

    service.update_availability_based_on_assignments(volunteer).await;

    let (is_available, notes): (bool, Option<String>) = sqlx::query_as(
        "SELECT is_available, notes FROM volunteer_profiles WHERE user_id = $1",
    )
    .bind(volunteer)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(!is_available);
    assert!(notes.unwrap().contains("at capacity"));

    let audit = AvailabilityLogRepo::list_for_volunteer(&pool, volunteer)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert!(audit[0].previous_status);
    assert!(!audit[0].new_status);
    assert_eq!(audit[0].reason, "at capacity");

    // Re-running without a workload change writes nothing further.
    service.update_availability_based_on_assignments(volunteer).await;
    let audit = AvailabilityLogRepo::list_for_volunteer(&pool, volunteer)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);

    // Resolving one assignment flips the volunteer back.
    sqlx::query("UPDATE incidents SET status = $1, resolved_at = NOW() WHERE id = $2")
        .bind(INCIDENT_RESOLVED)
        .bind(second)
        .execute(&pool)
        .await
        .unwrap();
    service.update_availability_based_on_assignments(volunteer).await;

    let audit = AvailabilityLogRepo::list_for_volunteer(&pool, volunteer)
        .await
        .unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].reason, "assignments completed");
    assert!(audit[0].new_status);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn aggregates_partition_by_capacity_pressure(pool: PgPool) {
    let service = VolunteerAvailabilityService::new(pool.clone());
    let idle = seed_volunteer(&pool, &[], true).await;
    let loaded = seed_volunteer(&pool, &[], true).await;
    seed_open_incident(&pool, loaded).await;
    seed_open_incident(&pool, loaded).await;
    let overloaded = seed_volunteer(&pool, &[], true).await;
    for _ in 0..3 {
        seed_open_incident(&pool, overloaded).await;
    }

    let available = service.get_all_available_volunteers().await;
    assert!(!available.partial);
    assert_eq!(available.skipped, 0);
    assert_eq!(
        available.volunteers.iter().map(|v| v.volunteer_id).collect::<Vec<_>>(),
        vec![idle]
    );

    let approaching = service.get_volunteers_approaching_capacity().await;
    let ids: Vec<_> = approaching.volunteers.iter().map(|v| v.volunteer_id).collect();
    assert!(ids.contains(&loaded));
    assert!(ids.contains(&overloaded));
    assert!(!ids.contains(&idle));

    let over = service.get_overloaded_volunteers().await;
    assert_eq!(
        over.volunteers.iter().map(|v| v.volunteer_id).collect::<Vec<_>>(),
        vec![overloaded]
    );
}
