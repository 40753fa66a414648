use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use super::super::{
    check_pick_identity, CalculationContext, MetricCalculator, StatsError, StatsMetrics,
};
use crate::picks::{GamePick, GameScore, PickStore, SeasonScope};

/// Missed picks and perfect weeks.
///
/// Both metrics join the user's picks to scored games by game reference, so
/// a game counts as missed exactly when it keeps a week from being perfect.
pub struct MissedPicksCalculator;

impl Default for MissedPicksCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl MissedPicksCalculator {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceSummary {
    pub missed_picks: i32,
    pub perfect_weeks: i32,
}

impl AttendanceSummary {
    /// `games` must already be restricted to scored games in the scope.
    /// `picks` are matched by game reference only, whatever season label
    /// they carry.
    ///
    /// Several picks on one game count as a single pick, and that pick is
    /// correct when any of them is. A week with a correct and a wrong pick
    /// on the same game can therefore still be perfect.
    pub fn from_records(games: &[GameScore], picks: &[GamePick]) -> Self {
        let mut picked: HashMap<&str, bool> = HashMap::new();
        for pick in picks {
            if let Some(game_id) = pick.game_id.as_deref() {
                let correct = picked.entry(game_id).or_insert(false);
                *correct |= pick.pick_correct;
            }
        }

        // (season, week) -> (scored games, correctly picked games)
        let mut weeks: BTreeMap<(&str, &str), (usize, usize)> = BTreeMap::new();
        let mut missed = 0usize;
        for game in games {
            let season = game.game_season.as_deref().unwrap_or_default();
            let unit = weeks.entry((season, game.game_week.as_str())).or_default();
            unit.0 += 1;
            match picked.get(game.game_id.as_str()) {
                Some(true) => unit.1 += 1,
                Some(false) => {}
                None => missed += 1,
            }
        }

        let perfect = weeks
            .values()
            .filter(|(scored, correct)| *scored > 0 && correct == scored)
            .count();

        Self {
            missed_picks: missed as i32,
            perfect_weeks: perfect as i32,
        }
    }
}

#[async_trait]
impl MetricCalculator for MissedPicksCalculator {
    fn name(&self) -> &'static str {
        "missed_picks"
    }

    async fn calculate(
        &self,
        store: &dyn PickStore,
        user_id: &str,
        context: &CalculationContext<'_>,
    ) -> Result<StatsMetrics, StatsError> {
        // Every season-tagged pick takes part in both scopes; only the games
        // are restricted to the season.
        let picks = store.picks_for_user(user_id, &SeasonScope::Total).await?;
        check_pick_identity(user_id, &picks)?;

        let total_games = store.scored_games(&SeasonScope::Total).await?;
        let total = AttendanceSummary::from_records(&total_games, &picks);

        let mut metrics = StatsMetrics {
            missed_picks_total: Some(total.missed_picks),
            perfect_weeks_total: Some(total.perfect_weeks),
            ..StatsMetrics::default()
        };

        match store.scored_games(&context.season_scope()).await {
            Ok(season_games) => {
                let season = AttendanceSummary::from_records(&season_games, &picks);
                metrics.missed_picks_season = Some(season.missed_picks);
                metrics.perfect_weeks_season = Some(season.perfect_weeks);
            }
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    season = context.current_season,
                    error = %err,
                    "Season missed picks skipped"
                );
            }
        }

        Ok(metrics)
    }
}
