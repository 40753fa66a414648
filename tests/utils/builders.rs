#![allow(dead_code)] // Test utilities may not all be used in every test

use pickem_stats::{GamePick, GameScore, SeasonPoints};

// ============================================================================
// Pick History Builder
// ============================================================================

/// Accumulates picks, scored games and season points for a scenario.
#[derive(Default)]
pub struct PickHistoryBuilder {
    pub picks: Vec<GamePick>,
    pub games: Vec<GameScore>,
    pub season_points: Vec<SeasonPoints>,
    next_game: usize,
}

impl PickHistoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_game_id(&mut self) -> String {
        self.next_game += 1;
        format!("game-{}", self.next_game)
    }

    /// Adds a scored game and the user's pick on it.
    pub fn with_scored_pick(
        mut self,
        user: &str,
        team: &str,
        season: &str,
        week: &str,
        correct: bool,
    ) -> Self {
        let game_id = self.next_game_id();
        self.games.push(GameScore::scored(game_id.clone(), season, week));
        let pick = GamePick::new(user, team, season, week).for_game(game_id);
        self.picks.push(if correct { pick.correct() } else { pick });
        self
    }

    /// Adds a scored game nobody picked.
    pub fn with_unpicked_game(mut self, season: &str, week: &str) -> Self {
        let game_id = self.next_game_id();
        self.games.push(GameScore::scored(game_id, season, week));
        self
    }

    /// Adds `count` picks of `team` that are not tied to a game.
    pub fn with_team_picks(mut self, user: &str, team: &str, season: &str, count: usize) -> Self {
        for week in 1..=count {
            self.picks.push(GamePick::new(user, team, season, week.to_string()));
        }
        self
    }

    pub fn with_weeks_won(mut self, user: &str, season: &str, weeks: &[usize]) -> Self {
        self.season_points.push(SeasonPoints::new(user, season).with_weeks_won(weeks));
        self
    }

    pub fn with_season_won(mut self, user: &str, season: &str) -> Self {
        self.season_points.push(SeasonPoints::new(user, season).with_year_winner());
        self
    }
}
