use async_trait::async_trait;
use tracing::{debug, warn};

use super::super::{CalculationContext, MetricCalculator, StatsError, StatsMetrics};
use crate::picks::{PickStore, SeasonPoints, SeasonScope};

/// Weekly wins (total and current season) and whole seasons won, from the
/// season-points table.
pub struct WeeksWonCalculator;

impl Default for WeeksWonCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl WeeksWonCalculator {
    pub fn new() -> Self {
        Self
    }
}

fn weeks_won(rows: &[SeasonPoints]) -> i32 {
    rows.iter().map(SeasonPoints::weeks_won).sum()
}

fn seasons_won(rows: &[SeasonPoints]) -> i32 {
    rows.iter().filter(|row| row.year_winner).count() as i32
}

#[async_trait]
impl MetricCalculator for WeeksWonCalculator {
    fn name(&self) -> &'static str {
        "weeks_won"
    }

    async fn calculate(
        &self,
        store: &dyn PickStore,
        user_id: &str,
        context: &CalculationContext<'_>,
    ) -> Result<StatsMetrics, StatsError> {
        // No rows is a valid zero, not an error.
        let all_rows = store
            .season_points_for_user(user_id, &SeasonScope::Total)
            .await?;
        if all_rows.is_empty() {
            debug!(user_id = %user_id, "No season points recorded, weeks won is 0");
        }

        let mut metrics = StatsMetrics {
            weeks_won_total: Some(weeks_won(&all_rows)),
            seasons_won: Some(seasons_won(&all_rows)),
            ..StatsMetrics::default()
        };

        match store
            .season_points_for_user(user_id, &context.season_scope())
            .await
        {
            Ok(season_rows) => metrics.weeks_won_season = Some(weeks_won(&season_rows)),
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    season = context.current_season,
                    error = %err,
                    "Season weeks won skipped"
                );
            }
        }

        Ok(metrics)
    }
}
