use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::super::{
    check_pick_identity, CalculationContext, MetricCalculator, StatsError, StatsMetrics,
};
use crate::picks::{GamePick, PickStore, SeasonScope};

const TIE_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickExtremum {
    Most,
    Least,
}

/// Team(s) a user picked the most or the least. Ties are all reported.
pub struct TeamFrequencyCalculator {
    extremum: PickExtremum,
}

impl TeamFrequencyCalculator {
    pub fn most_picked() -> Self {
        Self {
            extremum: PickExtremum::Most,
        }
    }

    pub fn least_picked() -> Self {
        Self {
            extremum: PickExtremum::Least,
        }
    }

    /// Per-team counts ordered by count (descending for Most, ascending for
    /// Least), then by team name.
    fn ranked_counts(&self, picks: &[GamePick]) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for pick in picks {
            *counts.entry(pick.pick.as_str()).or_default() += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(team, count)| (team.to_string(), count))
            .collect();
        ranked.sort_by(|(team_a, count_a), (team_b, count_b)| {
            let by_count = match self.extremum {
                PickExtremum::Most => count_b.cmp(count_a),
                PickExtremum::Least => count_a.cmp(count_b),
            };
            match by_count {
                Ordering::Equal => team_a.cmp(team_b),
                other => other,
            }
        });
        ranked
    }

    /// `None` when there are no picks.
    pub fn select(&self, picks: &[GamePick]) -> Option<String> {
        let ranked = self.ranked_counts(picks);
        let (_, extreme) = ranked.first()?;
        let extreme = *extreme;

        let teams: Vec<&str> = ranked
            .iter()
            .take_while(|(_, count)| *count == extreme)
            .map(|(team, _)| team.as_str())
            .collect();
        Some(teams.join(TIE_SEPARATOR))
    }

    fn assign(&self, metrics: &mut StatsMetrics, scope: &SeasonScope, teams: Option<String>) {
        let field = match (self.extremum, scope) {
            (PickExtremum::Most, SeasonScope::Total) => &mut metrics.most_picked_total,
            (PickExtremum::Most, SeasonScope::Season(_)) => &mut metrics.most_picked_season,
            (PickExtremum::Least, SeasonScope::Total) => &mut metrics.least_picked_total,
            (PickExtremum::Least, SeasonScope::Season(_)) => &mut metrics.least_picked_season,
        };
        *field = teams;
    }
}

#[async_trait]
impl MetricCalculator for TeamFrequencyCalculator {
    fn name(&self) -> &'static str {
        match self.extremum {
            PickExtremum::Most => "most_picked",
            PickExtremum::Least => "least_picked",
        }
    }

    async fn calculate(
        &self,
        store: &dyn PickStore,
        user_id: &str,
        context: &CalculationContext<'_>,
    ) -> Result<StatsMetrics, StatsError> {
        let mut metrics = StatsMetrics::default();

        let total_picks = store.picks_for_user(user_id, &SeasonScope::Total).await?;
        check_pick_identity(user_id, &total_picks)?;
        self.assign(&mut metrics, &SeasonScope::Total, self.select(&total_picks));

        let season_scope = context.season_scope();
        match store.picks_for_user(user_id, &season_scope).await {
            Ok(season_picks) => {
                let teams = self.select(&season_picks);
                if teams.is_none() {
                    debug!(
                        user_id = %user_id,
                        season = context.current_season,
                        calculator = self.name(),
                        "No picks this season"
                    );
                }
                self.assign(&mut metrics, &season_scope, teams);
            }
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    calculator = self.name(),
                    error = %err,
                    "Season team frequency skipped"
                );
            }
        }

        Ok(metrics)
    }
}
