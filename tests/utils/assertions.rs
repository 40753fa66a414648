//! Test assertion helpers - fluent API for verifying stored stats
#![allow(dead_code)] // Test utilities may not all be used in every test

use pickem_stats::{StatsMetrics, StatsRepository, UserStats};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct StatsAssertion {
    row: UserStats,
}

impl StatsAssertion {
    /// Loads the stored row for `user`, failing the test if there is none.
    pub async fn for_user(setup: &TestSetup, user: &str) -> Self {
        let row = setup
            .repository
            .get_user_stats(user)
            .await
            .expect("stats lookup should succeed");
        assert!(row.is_some(), "{} should have a stats row", user);
        Self { row: row.unwrap() }
    }

    pub fn metrics(&self) -> &StatsMetrics {
        &self.row.metrics
    }

    pub fn has_email(self, expected: &str) -> Self {
        assert_eq!(self.row.user_email, expected, "unexpected email");
        self
    }

    pub fn has_perfect_weeks(self, season: i32, total: i32) -> Self {
        assert_eq!(self.row.metrics.perfect_weeks_season, Some(season), "perfectWeeksSeason");
        assert_eq!(self.row.metrics.perfect_weeks_total, Some(total), "perfectWeeksTotal");
        self
    }

    pub fn has_missed_picks(self, season: i32, total: i32) -> Self {
        assert_eq!(self.row.metrics.missed_picks_season, Some(season), "missedPicksSeason");
        assert_eq!(self.row.metrics.missed_picks_total, Some(total), "missedPicksTotal");
        self
    }

    pub fn has_most_picked_total(self, expected: &str) -> Self {
        assert_eq!(
            self.row.metrics.most_picked_total.as_deref(),
            Some(expected),
            "mostPickedTotal"
        );
        self
    }

    pub fn has_least_picked_total(self, expected: &str) -> Self {
        assert_eq!(
            self.row.metrics.least_picked_total.as_deref(),
            Some(expected),
            "leastPickedTotal"
        );
        self
    }

    pub fn has_pick_percent(self, season: i32, total: i32) -> Self {
        assert_eq!(self.row.metrics.pick_percent_season, Some(season), "pickPercentSeason");
        assert_eq!(self.row.metrics.pick_percent_total, Some(total), "pickPercentTotal");
        self
    }

    pub fn has_weeks_won(self, season: i32, total: i32) -> Self {
        assert_eq!(self.row.metrics.weeks_won_season, Some(season), "weeksWonSeason");
        assert_eq!(self.row.metrics.weeks_won_total, Some(total), "weeksWonTotal");
        self
    }

    pub fn has_seasons_won(self, expected: i32) -> Self {
        assert_eq!(self.row.metrics.seasons_won, Some(expected), "seasonsWon");
        self
    }

    /// Checks the clamping invariant on every missed-pick counter.
    pub fn has_non_negative_missed_picks(self) -> Self {
        for value in [
            self.row.metrics.missed_picks_season,
            self.row.metrics.missed_picks_total,
        ]
        .into_iter()
        .flatten()
        {
            assert!(value >= 0, "missed picks should never be negative");
        }
        self
    }
}
