//! Well-known status, channel, and event-type string constants.
//!
//! These must match the values stored in the `incidents.status`,
//! `notification_deliveries.status`, `notification_read_status.read_via`,
//! and `volunteer_fallback_logs.event_type` columns. The fallback engine and
//! the CRUD layer both read and write these tables, so the strings are the
//! shared contract.

/// Incident has been assigned to a volunteer and awaits acknowledgment.
pub const INCIDENT_ASSIGNED: &str = "ASSIGNED";

/// The assignee has acknowledged and is responding.
pub const INCIDENT_RESPONDING: &str = "RESPONDING";

/// Incident has been resolved.
pub const INCIDENT_RESOLVED: &str = "RESOLVED";

/// Incident statuses that count as an open assignment for a volunteer.
pub const OPEN_ASSIGNMENT_STATUSES: [&str; 2] = [INCIDENT_ASSIGNED, INCIDENT_RESPONDING];

/// Delivery statuses for `notification_deliveries.status`.
pub mod delivery {
    pub const PENDING: &str = "PENDING";
    pub const SENT: &str = "SENT";
    pub const DELIVERED: &str = "DELIVERED";
    pub const FAILED: &str = "FAILED";
    pub const EXPIRED: &str = "EXPIRED";
}

/// Channels through which a read can be observed (`read_via`).
pub mod read_via {
    pub const PUSH: &str = "PUSH";
    pub const WEB: &str = "WEB";
    pub const SMS: &str = "SMS";
}

/// Notification categories gated by `notification_preferences`.
pub mod category {
    pub const INCIDENT_ALERTS: &str = "incident_alerts";
    pub const STATUS_UPDATES: &str = "status_updates";
    pub const ESCALATION_ALERTS: &str = "escalation_alerts";
    pub const TRAINING_REMINDERS: &str = "training_reminders";
}

/// Event types written to `volunteer_fallback_logs.event_type`.
pub mod fallback_event {
    pub const MONITORING_STARTED: &str = "MONITORING_STARTED";
    pub const MONITORING_STOPPED: &str = "MONITORING_STOPPED";
    pub const SMS_FALLBACK_SENT: &str = "SMS_FALLBACK_SENT";
    pub const SMS_FALLBACK_FAILED: &str = "SMS_FALLBACK_FAILED";
    pub const REMINDER_SENT: &str = "REMINDER_SENT";
}

/// Escalation stages carried by `fallback_tasks.stage`.
pub mod fallback_stage {
    /// First tier: send the SMS fallback if still unacknowledged.
    pub const FALLBACK: &str = "FALLBACK";
    /// Second tier: send the reminder SMS.
    pub const REMINDER: &str = "REMINDER";
}
