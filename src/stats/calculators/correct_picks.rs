use async_trait::async_trait;
use tracing::warn;

use super::super::{
    check_pick_identity, CalculationContext, MetricCalculator, StatsError, StatsMetrics,
};
use crate::picks::{GamePick, PickStore, SeasonScope};

/// Total picks, correct picks and the floored percentage, for all time and
/// for the current season.
pub struct CorrectPicksCalculator;

impl Default for CorrectPicksCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectPicksCalculator {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickAccuracy {
    pub total: i32,
    pub correct: i32,
    pub percent: i32,
}

impl PickAccuracy {
    pub fn from_picks(picks: &[GamePick]) -> Self {
        let total = picks.len() as i32;
        let correct = picks.iter().filter(|pick| pick.pick_correct).count() as i32;
        let percent = if total == 0 {
            0
        } else {
            correct * 100 / total
        };
        Self {
            total,
            correct,
            percent,
        }
    }
}

#[async_trait]
impl MetricCalculator for CorrectPicksCalculator {
    fn name(&self) -> &'static str {
        "correct_picks"
    }

    async fn calculate(
        &self,
        store: &dyn PickStore,
        user_id: &str,
        context: &CalculationContext<'_>,
    ) -> Result<StatsMetrics, StatsError> {
        let total_picks = store.picks_for_user(user_id, &SeasonScope::Total).await?;
        check_pick_identity(user_id, &total_picks)?;
        let total = PickAccuracy::from_picks(&total_picks);

        let mut metrics = StatsMetrics {
            total_picks_total: Some(total.total),
            correct_pick_total_total: Some(total.correct),
            pick_percent_total: Some(total.percent),
            ..StatsMetrics::default()
        };

        match store.picks_for_user(user_id, &context.season_scope()).await {
            Ok(season_picks) => {
                let season = PickAccuracy::from_picks(&season_picks);
                metrics.total_picks_season = Some(season.total);
                metrics.correct_pick_total_season = Some(season.correct);
                metrics.pick_percent_season = Some(season.percent);
            }
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    season = context.current_season,
                    error = %err,
                    "Season pick accuracy skipped"
                );
            }
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picks::InMemoryPickStore;
    use rstest::rstest;

    fn picks(correct: usize, wrong: usize) -> Vec<GamePick> {
        let mut picks = Vec::new();
        for i in 0..correct {
            picks.push(GamePick::new("u1", format!("T{i}"), "2425", "1").correct());
        }
        for i in 0..wrong {
            picks.push(GamePick::new("u1", format!("W{i}"), "2425", "1"));
        }
        picks
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 0, 100)]
    #[case(2, 1, 66)]
    #[case(29, 71, 29)]
    #[case(0, 5, 0)]
    fn percent_is_floored(#[case] correct: usize, #[case] wrong: usize, #[case] expected: i32) {
        let accuracy = PickAccuracy::from_picks(&picks(correct, wrong));
        assert_eq!(accuracy.percent, expected);
        assert_eq!(accuracy.total, (correct + wrong) as i32);
    }

    #[tokio::test]
    async fn computes_total_and_season_accuracy() {
        let store = InMemoryPickStore::new().with_picks(vec![
            GamePick::new("u1", "NYG", "2425", "1").correct(),
            GamePick::new("u1", "DAL", "2425", "2"),
            GamePick::new("u1", "PHI", "2324", "1").correct(),
            GamePick::new("u1", "WAS", "2324", "2").correct(),
        ]);
        let context = CalculationContext::new("2425");

        let metrics = CorrectPicksCalculator::new()
            .calculate(&store, "u1", &context)
            .await
            .unwrap();

        assert_eq!(metrics.total_picks_total, Some(4));
        assert_eq!(metrics.correct_pick_total_total, Some(3));
        assert_eq!(metrics.pick_percent_total, Some(75));
        assert_eq!(metrics.total_picks_season, Some(2));
        assert_eq!(metrics.correct_pick_total_season, Some(1));
        assert_eq!(metrics.pick_percent_season, Some(50));
    }

    #[tokio::test]
    async fn user_without_picks_has_zero_percent() {
        let store = InMemoryPickStore::new();
        let context = CalculationContext::new("2425");

        let metrics = CorrectPicksCalculator::new()
            .calculate(&store, "nobody", &context)
            .await
            .unwrap();

        assert_eq!(metrics.total_picks_total, Some(0));
        assert_eq!(metrics.pick_percent_total, Some(0));
        assert_eq!(metrics.pick_percent_season, Some(0));
    }

    #[tokio::test]
    async fn season_failure_keeps_total_values() {
        let store = InMemoryPickStore::new()
            .with_picks(vec![GamePick::new("u1", "NYG", "2425", "1").correct()]);
        store.fail_scope(SeasonScope::Season("2425".into())).await;
        let context = CalculationContext::new("2425");

        let metrics = CorrectPicksCalculator::new()
            .calculate(&store, "u1", &context)
            .await
            .unwrap();

        assert_eq!(metrics.pick_percent_total, Some(100));
        assert_eq!(metrics.total_picks_season, None);
        assert_eq!(metrics.pick_percent_season, None);
    }

    #[tokio::test]
    async fn rejects_mismatched_pick_identity() {
        let mut pick = GamePick::new("u1", "NYG", "2425", "1");
        pick.user_id = Some("someone-else".into());
        let store = InMemoryPickStore::new().with_picks(vec![pick]);
        let context = CalculationContext::new("2425");

        let result = CorrectPicksCalculator::new()
            .calculate(&store, "u1", &context)
            .await;

        assert!(matches!(result, Err(StatsError::IdentityMismatch { .. })));
    }
}
