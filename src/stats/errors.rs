use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// Connectivity failure; aborts the whole run.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("No fields to update for user {user_id}")]
    NoFieldsToUpdate { user_id: String },

    #[error("Pick identity mismatch: uid {uid} recorded with userID {user_id}")]
    IdentityMismatch { uid: String, user_id: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl StatsError {
    /// Only a lost store connection ends a run early.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StatsError::StoreUnavailable(_))
    }
}
