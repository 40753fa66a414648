use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single metric value bound into an insert or update statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricValue {
    Count(i32),
    Teams(String),
}

/// Calculated metrics for one user. `None` means "not computed this pass":
/// the stored value is left untouched on upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsMetrics {
    pub weeks_won_season: Option<i32>,
    pub weeks_won_total: Option<i32>,
    pub pick_percent_season: Option<i32>,
    pub pick_percent_total: Option<i32>,
    pub correct_pick_total_season: Option<i32>,
    pub correct_pick_total_total: Option<i32>,
    pub total_picks_season: Option<i32>,
    pub total_picks_total: Option<i32>,
    pub most_picked_season: Option<String>,
    pub most_picked_total: Option<String>,
    pub least_picked_season: Option<String>,
    pub least_picked_total: Option<String>,
    pub seasons_won: Option<i32>,
    pub missed_picks_season: Option<i32>,
    pub missed_picks_total: Option<i32>,
    pub perfect_weeks_season: Option<i32>,
    pub perfect_weeks_total: Option<i32>,
}

impl StatsMetrics {
    /// Present fields paired with their column names, in table column order.
    pub fn present_fields(&self) -> Vec<(&'static str, MetricValue)> {
        let counts = [
            ("weeksWonSeason", self.weeks_won_season),
            ("weeksWonTotal", self.weeks_won_total),
            ("pickPercentSeason", self.pick_percent_season),
            ("pickPercentTotal", self.pick_percent_total),
            ("correctPickTotalSeason", self.correct_pick_total_season),
            ("correctPickTotalTotal", self.correct_pick_total_total),
            ("totalPicksSeason", self.total_picks_season),
            ("totalPicksTotal", self.total_picks_total),
        ];
        let teams = [
            ("mostPickedSeason", &self.most_picked_season),
            ("mostPickedTotal", &self.most_picked_total),
            ("leastPickedSeason", &self.least_picked_season),
            ("leastPickedTotal", &self.least_picked_total),
        ];
        let trailing = [
            ("seasonsWon", self.seasons_won),
            ("missedPicksSeason", self.missed_picks_season),
            ("missedPicksTotal", self.missed_picks_total),
            ("perfectWeeksSeason", self.perfect_weeks_season),
            ("perfectWeeksTotal", self.perfect_weeks_total),
        ];

        let mut fields = Vec::new();
        for (column, value) in counts {
            if let Some(value) = value {
                fields.push((column, MetricValue::Count(value)));
            }
        }
        for (column, value) in teams {
            if let Some(value) = value {
                fields.push((column, MetricValue::Teams(value.clone())));
            }
        }
        for (column, value) in trailing {
            if let Some(value) = value {
                fields.push((column, MetricValue::Count(value)));
            }
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Overwrites every field that is present in `update`, keeping the rest.
    pub fn apply(&mut self, update: &StatsMetrics) {
        overlay(&mut self.weeks_won_season, &update.weeks_won_season);
        overlay(&mut self.weeks_won_total, &update.weeks_won_total);
        overlay(&mut self.pick_percent_season, &update.pick_percent_season);
        overlay(&mut self.pick_percent_total, &update.pick_percent_total);
        overlay(
            &mut self.correct_pick_total_season,
            &update.correct_pick_total_season,
        );
        overlay(
            &mut self.correct_pick_total_total,
            &update.correct_pick_total_total,
        );
        overlay(&mut self.total_picks_season, &update.total_picks_season);
        overlay(&mut self.total_picks_total, &update.total_picks_total);
        overlay(&mut self.most_picked_season, &update.most_picked_season);
        overlay(&mut self.most_picked_total, &update.most_picked_total);
        overlay(&mut self.least_picked_season, &update.least_picked_season);
        overlay(&mut self.least_picked_total, &update.least_picked_total);
        overlay(&mut self.seasons_won, &update.seasons_won);
        overlay(&mut self.missed_picks_season, &update.missed_picks_season);
        overlay(&mut self.missed_picks_total, &update.missed_picks_total);
        overlay(&mut self.perfect_weeks_season, &update.perfect_weeks_season);
        overlay(&mut self.perfect_weeks_total, &update.perfect_weeks_total);
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        target.clone_from(source);
    }
}

/// Stored statistics row (`pickem_api_userstats`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub user_email: String,
    #[serde(flatten)]
    pub metrics: StatsMetrics,
}

impl UserStats {
    pub fn new(update: &StatsUpdate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: update.user_id.clone(),
            user_email: update.user_email.clone(),
            metrics: update.metrics.clone(),
        }
    }
}

/// Partial record produced by one calculator for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsUpdate {
    pub user_id: String,
    pub user_email: String,
    pub metrics: StatsMetrics,
}

impl StatsUpdate {
    pub fn new(user_id: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_email: user_email.into(),
            metrics: StatsMetrics::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: StatsMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Outcome of one full pass over all users.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users: usize,
    pub upserts: usize,
    pub failures: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_fields_skips_absent_metrics() {
        let metrics = StatsMetrics {
            weeks_won_total: Some(3),
            most_picked_total: Some("NYG".into()),
            ..StatsMetrics::default()
        };

        let fields = metrics.present_fields();
        assert_eq!(
            fields,
            vec![
                ("weeksWonTotal", MetricValue::Count(3)),
                ("mostPickedTotal", MetricValue::Teams("NYG".into())),
            ]
        );
    }

    #[test]
    fn empty_metrics_have_no_fields() {
        assert!(StatsMetrics::default().is_empty());
    }

    #[test]
    fn apply_keeps_fields_missing_from_update() {
        let mut stored = StatsMetrics {
            weeks_won_total: Some(3),
            pick_percent_total: Some(50),
            ..StatsMetrics::default()
        };
        let update = StatsMetrics {
            pick_percent_total: Some(75),
            most_picked_total: Some("DAL".into()),
            ..StatsMetrics::default()
        };

        stored.apply(&update);

        assert_eq!(stored.weeks_won_total, Some(3));
        assert_eq!(stored.pick_percent_total, Some(75));
        assert_eq!(stored.most_picked_total.as_deref(), Some("DAL"));
    }
}
