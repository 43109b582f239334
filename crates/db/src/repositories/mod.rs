//! Stateless repository structs, one per table.

pub mod availability_log_repo;
pub mod fallback_log_repo;
pub mod fallback_task_repo;
pub mod incident_repo;
pub mod incident_view_repo;
pub mod notification_delivery_repo;
pub mod notification_preference_repo;
pub mod notification_read_status_repo;
pub mod notification_repo;
pub mod push_subscription_repo;
pub mod volunteer_profile_repo;

pub use availability_log_repo::AvailabilityLogRepo;
pub use fallback_log_repo::FallbackLogRepo;
pub use fallback_task_repo::FallbackTaskRepo;
pub use incident_repo::IncidentRepo;
pub use incident_view_repo::IncidentViewRepo;
pub use notification_delivery_repo::NotificationDeliveryRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_read_status_repo::NotificationReadStatusRepo;
pub use notification_repo::NotificationRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use volunteer_profile_repo::VolunteerProfileRepo;
