//! Volunteer assignment-capacity model.
//!
//! Capacity starts at a base of 2 concurrent assignments and earns bonuses
//! for qualifying skills and resolved-incident experience, capped at 5.
//! The same computation backs the availability recalculator and the
//! capacity-pressure aggregate queries.

/// Base number of concurrent assignments every volunteer can hold.
pub const BASE_CAPACITY: u32 = 2;

/// Hard upper bound on capacity regardless of accumulated bonuses.
pub const MAX_CAPACITY: u32 = 5;

/// Skills that each grant a +1 capacity bonus.
pub const BONUS_SKILLS: [&str; 3] = ["LEADERSHIP", "MEDICAL PROFESSIONAL", "EMERGENCY RESPONSE"];

/// Resolved-incident counts above which experience bonuses apply.
pub const EXPERIENCE_TIER_1: i64 = 50;
pub const EXPERIENCE_TIER_2: i64 = 100;

/// Flat estimate (minutes per open assignment) when no historical
/// resolution samples are available.
pub const DEFAULT_RESOLUTION_MINUTES: f64 = 120.0;

/// Compute a volunteer's maximum concurrent-assignment capacity.
///
/// Skill matching is case-insensitive; each bonus skill counts at most once
/// however many times it appears on the profile.
pub fn max_assignments(skills: &[String], resolved_incidents: i64) -> u32 {
    let mut capacity = BASE_CAPACITY;

    for bonus in BONUS_SKILLS {
        if skills.iter().any(|s| s.trim().eq_ignore_ascii_case(bonus)) {
            capacity += 1;
        }
    }

    if resolved_incidents > EXPERIENCE_TIER_1 {
        capacity += 1;
    }
    if resolved_incidents > EXPERIENCE_TIER_2 {
        capacity += 1;
    }

    capacity.min(MAX_CAPACITY)
}
