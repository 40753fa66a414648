use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::store::PickStore;
use crate::stats::StatsError;

/// Produces the distinct users to visit in one run
pub struct UserEnumerator {
    store: Arc<dyn PickStore>,
}

impl UserEnumerator {
    pub fn new(store: Arc<dyn PickStore>) -> Self {
        Self { store }
    }

    /// Distinct users with at least one season-tagged pick, in first-seen order.
    ///
    /// Any store failure is reported as `StoreUnavailable`: without a user
    /// list the run cannot proceed.
    #[instrument(skip(self))]
    pub async fn distinct_users(&self) -> Result<Vec<String>, StatsError> {
        let user_ids = self.store.pick_user_ids().await.map_err(|e| match e {
            StatsError::StoreUnavailable(msg) => StatsError::StoreUnavailable(msg),
            other => StatsError::StoreUnavailable(other.to_string()),
        })?;

        let mut seen = HashSet::new();
        let users: Vec<String> = user_ids
            .into_iter()
            .filter(|user_id| seen.insert(user_id.clone()))
            .collect();

        debug!(count = users.len(), "Enumerated pick users");
        Ok(users)
    }
}
