pub mod calculators;
pub mod repository;
pub mod service;

mod errors;
pub mod models;

pub use errors::StatsError;
pub use models::*;
pub use repository::{InMemoryStatsRepository, PostgresStatsRepository, StatsRepository};
pub use service::{StatsService, StatsServiceBuilder};

use async_trait::async_trait;

use crate::picks::{GamePick, PickStore, SeasonScope};

/// Computes one group of metrics for one user.
///
/// Implementations only read through the store and return the fields they
/// own; persistence is left to the service.
#[async_trait]
pub trait MetricCalculator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn calculate(
        &self,
        store: &dyn PickStore,
        user_id: &str,
        context: &CalculationContext<'_>,
    ) -> Result<StatsMetrics, StatsError>;
}

/// Run-wide settings handed to every calculator call.
#[derive(Debug, Clone, Copy)]
pub struct CalculationContext<'a> {
    pub current_season: &'a str,
}

impl<'a> CalculationContext<'a> {
    pub fn new(current_season: &'a str) -> Self {
        Self { current_season }
    }

    pub fn season_scope(&self) -> SeasonScope {
        SeasonScope::Season(self.current_season.to_string())
    }
}

/// Rejects picks whose legacy `userID` disagrees with the canonical `uid`.
pub(crate) fn check_pick_identity(uid: &str, picks: &[GamePick]) -> Result<(), StatsError> {
    for pick in picks {
        if let Some(user_id) = pick.user_id.as_deref() {
            if user_id != pick.uid || pick.uid != uid {
                return Err(StatsError::IdentityMismatch {
                    uid: pick.uid.clone(),
                    user_id: user_id.to_string(),
                });
            }
        }
    }
    Ok(())
}
