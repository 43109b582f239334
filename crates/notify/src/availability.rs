//! Volunteer availability recalculation.
//!
//! A volunteer's effective availability is derived, not stored: the stored
//! `is_available` flag combined with live open-assignment counts against the
//! capacity model. [`VolunteerAvailabilityService`] computes the per-volunteer
//! view, flips the stored flag when workload crosses capacity, and answers
//! the capacity-pressure aggregate queries.

use chrono::Utc;

use rvois_core::capacity::{self, DEFAULT_RESOLUTION_MINUTES};
use rvois_core::types::{DbId, Timestamp};
use rvois_db::models::incident::Incident;
use rvois_db::repositories::{AvailabilityLogRepo, IncidentRepo, VolunteerProfileRepo};
use rvois_db::DbPool;

/// Fraction of capacity at which a volunteer counts as "approaching".
const APPROACHING_CAPACITY_RATIO: f64 = 0.8;

/// How many resolved incidents feed the resolution-time average.
const RESOLUTION_SAMPLE_LIMIT: i64 = 10;

/// Derived availability view for one volunteer.
#[derive(Debug, Clone)]
pub struct VolunteerAvailability {
    pub volunteer_id: DbId,
    pub is_available: bool,
    pub open_assignments: i64,
    pub max_assignments: u32,
    pub last_status_change: Timestamp,
    pub reason: Option<String>,
    /// Projected time the volunteer frees up, when they hold open work.
    pub estimated_available_at: Option<Timestamp>,
}

/// Result of an aggregate query over all volunteers.
///
/// Per-volunteer failures are skipped and counted rather than aborting the
/// batch; `partial` flags that the listing is incomplete.
#[derive(Debug, Clone)]
pub struct AvailabilityBatch {
    pub volunteers: Vec<VolunteerAvailability>,
    pub skipped: usize,
    pub partial: bool,
}

/// Keeps computed availability consistent with live workload.
pub struct VolunteerAvailabilityService {
    pool: DbPool,
}

impl VolunteerAvailabilityService {
    /// Create a service over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Compute the derived availability view for one volunteer.
    ///
    /// Returns `None` on any lookup failure (including an unknown
    /// volunteer); callers treat that as "no answer", not an error.
    pub async fn get_volunteer_availability(
        &self,
        volunteer_id: DbId,
    ) -> Option<VolunteerAvailability> {
        let profile = match VolunteerProfileRepo::get(&self.pool, volunteer_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(%volunteer_id, "Availability lookup: volunteer not found");
                return None;
            }
            Err(e) => {
                tracing::error!(%volunteer_id, error = %e, "Availability lookup: profile load failed");
                return None;
            }
        };

        let open_assignments = match IncidentRepo::count_open_for_volunteer(&self.pool, volunteer_id)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(%volunteer_id, error = %e, "Availability lookup: open count failed");
                return None;
            }
        };

        let resolved_total =
            match IncidentRepo::count_resolved_for_volunteer(&self.pool, volunteer_id).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!(%volunteer_id, error = %e, "Availability lookup: resolved count failed");
                    return None;
                }
            };

        let max_assignments = capacity::max_assignments(&profile.skills, resolved_total);
        let is_available = profile.is_available && open_assignments < max_assignments as i64;

        let estimated_available_at = if open_assignments > 0 {
            let samples = match IncidentRepo::recent_resolved_for_volunteer(
                &self.pool,
                volunteer_id,
                RESOLUTION_SAMPLE_LIMIT,
            )
            .await
            {
                Ok(samples) => samples,
                Err(e) => {
                    tracing::error!(%volunteer_id, error = %e, "Availability lookup: history load failed");
                    return None;
                }
            };
            Some(project_available_at(
                open_assignments,
                &resolution_minutes(&samples),
                Utc::now(),
            ))
        } else {
            None
        };

        Some(VolunteerAvailability {
            volunteer_id,
            is_available,
            open_assignments,
            max_assignments,
            last_status_change: profile.last_status_change,
            reason: profile.notes.clone(),
            estimated_available_at,
        })
    }

    /// Recompute availability after an assignment-count change and flip the
    /// stored flag if it disagrees with where the workload puts it.
    ///
    /// A flip appends a timestamped line to the profile notes and writes one
    /// audit row with the before/after booleans. Best-effort throughout.
    pub async fn update_availability_based_on_assignments(&self, volunteer_id: DbId) {
        let profile = match VolunteerProfileRepo::get(&self.pool, volunteer_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(%volunteer_id, "Availability update: volunteer not found");
                return;
            }
            Err(e) => {
                tracing::error!(%volunteer_id, error = %e, "Availability update: profile load failed");
                return;
            }
        };

        let open_assignments = match IncidentRepo::count_open_for_volunteer(&self.pool, volunteer_id)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(%volunteer_id, error = %e, "Availability update: open count failed");
                return;
            }
        };

        let resolved_total =
            match IncidentRepo::count_resolved_for_volunteer(&self.pool, volunteer_id).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!(%volunteer_id, error = %e, "Availability update: resolved count failed");
                    return;
                }
            };

        let max_assignments = capacity::max_assignments(&profile.skills, resolved_total);
        let should_be_available = open_assignments < max_assignments as i64;

        if profile.is_available == should_be_available {
            return;
        }

        let reason = if should_be_available {
            "assignments completed"
        } else {
            "at capacity"
        };
        let note_line = format!("[{}] auto: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"), reason);

        if let Err(e) = VolunteerProfileRepo::set_availability(
            &self.pool,
            volunteer_id,
            should_be_available,
            &note_line,
        )
        .await
        {
            tracing::error!(%volunteer_id, error = %e, "Availability update: flag write failed");
            return;
        }

        if let Err(e) = AvailabilityLogRepo::insert(
            &self.pool,
            volunteer_id,
            profile.is_available,
            should_be_available,
            reason,
        )
        .await
        {
            tracing::error!(%volunteer_id, error = %e, "Availability update: audit write failed");
        }

        tracing::info!(
            %volunteer_id,
            open_assignments,
            max_assignments,
            now_available = should_be_available,
            reason,
            "Volunteer availability updated"
        );
    }

    /// All volunteers currently able to take another assignment.
    pub async fn get_all_available_volunteers(&self) -> AvailabilityBatch {
        self.collect_matching(|a| a.is_available).await
    }

    /// Volunteers at or past 80% of their capacity.
    pub async fn get_volunteers_approaching_capacity(&self) -> AvailabilityBatch {
        self.collect_matching(|a| {
            a.open_assignments as f64 >= APPROACHING_CAPACITY_RATIO * a.max_assignments as f64
        })
        .await
    }

    /// Volunteers holding more open assignments than their capacity allows.
    pub async fn get_overloaded_volunteers(&self) -> AvailabilityBatch {
        self.collect_matching(|a| a.open_assignments > a.max_assignments as i64)
            .await
    }

    /// Map the per-volunteer computation over every profile, keeping those
    /// matching the predicate. A failed sub-computation skips that volunteer
    /// and counts them; it never aborts the batch.
    async fn collect_matching<F>(&self, keep: F) -> AvailabilityBatch
    where
        F: Fn(&VolunteerAvailability) -> bool,
    {
        let profiles = match VolunteerProfileRepo::list_all(&self.pool).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::error!(error = %e, "Availability aggregate: profile listing failed");
                return AvailabilityBatch {
                    volunteers: Vec::new(),
                    skipped: 0,
                    partial: true,
                };
            }
        };

        let mut volunteers = Vec::new();
        let mut skipped = 0usize;

        for profile in &profiles {
            match self.get_volunteer_availability(profile.user_id).await {
                Some(availability) => {
                    if keep(&availability) {
                        volunteers.push(availability);
                    }
                }
                None => skipped += 1,
            }
        }

        AvailabilityBatch {
            partial: skipped > 0,
            volunteers,
            skipped,
        }
    }
}

/// Durations (minutes) of resolved incidents with coherent timestamps.
///
/// Samples where resolution precedes creation are invalid and excluded.
fn resolution_minutes(incidents: &[Incident]) -> Vec<f64> {
    incidents
        .iter()
        .filter_map(|incident| {
            let resolved_at = incident.resolved_at?;
            let duration = resolved_at - incident.created_at;
            if duration < chrono::Duration::zero() {
                return None;
            }
            Some(duration.num_seconds() as f64 / 60.0)
        })
        .collect()
}

/// Project when a volunteer with `open` assignments frees up, given their
/// historical resolution durations. Falls back to a flat per-assignment
/// estimate when no valid samples exist.
fn project_available_at(open: i64, durations_min: &[f64], now: Timestamp) -> Timestamp {
    let per_assignment = if durations_min.is_empty() {
        DEFAULT_RESOLUTION_MINUTES
    } else {
        durations_min.iter().sum::<f64>() / durations_min.len() as f64
    };
    let total_minutes = per_assignment * open as f64;
    now + chrono::Duration::seconds((total_minutes * 60.0) as i64)
}
