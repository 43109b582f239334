//! RVOIS notification delivery and volunteer-fallback engine.
//!
//! This crate implements the escalation pipeline that keeps incident
//! assignments from going unnoticed:
//!
//! - [`NotificationDeliveryService`] — per-user delivery attempts, read
//!   receipts, and the preference gate in front of every push send.
//! - [`PushNotifier`] — push delivery to a user's registered endpoints.
//! - [`SmsGateway`] — contract for the external SMS subsystem, with an HTTP
//!   adapter.
//! - [`VolunteerFallbackService`] — the escalation state machine: push at
//!   assignment, SMS fallback 60 s later if unacknowledged, reminder SMS
//!   5 min after that.
//! - [`FallbackSweeper`] — periodic loop that claims due escalations from
//!   the persistent `fallback_tasks` store and executes them, so in-flight
//!   countdowns survive process restarts.
//! - [`VolunteerAvailabilityService`] — derives volunteer availability from
//!   open-assignment counts against the capacity model.
//! - [`retention`] — age-based purge of old delivery records.

pub mod availability;
pub mod fallback;
pub mod push;
pub mod reference;
pub mod retention;
pub mod sms;
pub mod sweeper;
pub mod tracker;

pub use availability::{AvailabilityBatch, VolunteerAvailability, VolunteerAvailabilityService};
pub use fallback::VolunteerFallbackService;
pub use push::{PushConfig, PushNotifier, PushPayload};
pub use reference::{HttpReferenceCodes, LocalReferenceCodes, ReferenceCodes};
pub use sms::{DisabledSmsGateway, HttpSmsGateway, SmsConfig, SmsContext, SmsGateway, SmsTemplate};
pub use sweeper::FallbackSweeper;
pub use tracker::NotificationDeliveryService;
