use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Notifications disabled for user {user_id}: {category}")]
    NotificationsDisabled { user_id: DbId, category: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
