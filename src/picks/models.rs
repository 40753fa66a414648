use serde::{Deserialize, Serialize};

/// Number of weekly winner flags on a season-points row.
pub const WEEKS_PER_SEASON: usize = 18;

/// Which records a metric ranges over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeasonScope {
    /// Every record tagged with a season.
    Total,
    /// Records of one season label (e.g. "2425").
    Season(String),
}

impl SeasonScope {
    pub fn includes(&self, game_season: Option<&str>) -> bool {
        match (self, game_season) {
            (_, None) => false,
            (SeasonScope::Total, Some(_)) => true,
            (SeasonScope::Season(label), Some(season)) => label == season,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SeasonScope::Total => "total",
            SeasonScope::Season(label) => label,
        }
    }
}

/// A user's pick for one game (`pickem_api_gamepicks`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePick {
    /// Canonical user key.
    pub uid: String,
    /// Legacy user column; must match `uid` when present.
    pub user_id: Option<String>,
    pub pick: String,
    pub pick_correct: bool,
    pub game_season: Option<String>,
    pub game_week: String,
    pub game_id: Option<String>,
}

impl GamePick {
    pub fn new(
        uid: impl Into<String>,
        pick: impl Into<String>,
        season: impl Into<String>,
        week: impl Into<String>,
    ) -> Self {
        let uid = uid.into();
        Self {
            user_id: Some(uid.clone()),
            uid,
            pick: pick.into(),
            pick_correct: false,
            game_season: Some(season.into()),
            game_week: week.into(),
            game_id: None,
        }
    }

    pub fn for_game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    pub fn correct(mut self) -> Self {
        self.pick_correct = true;
        self
    }
}

/// One game and whether it has been scored (`pickem_api_gamesandscores`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub game_id: String,
    pub game_season: Option<String>,
    pub game_week: String,
    pub game_scored: bool,
}

impl GameScore {
    pub fn scored(
        game_id: impl Into<String>,
        season: impl Into<String>,
        week: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            game_season: Some(season.into()),
            game_week: week.into(),
            game_scored: true,
        }
    }
}

/// Per-user, per-season winner flags (`pickem_api_userseasonpoints`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonPoints {
    pub user_id: String,
    pub game_season: Option<String>,
    pub weekly_winners: [bool; WEEKS_PER_SEASON],
    pub year_winner: bool,
}

impl SeasonPoints {
    pub fn new(user_id: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            game_season: Some(season.into()),
            weekly_winners: [false; WEEKS_PER_SEASON],
            year_winner: false,
        }
    }

    /// Marks 1-based weeks as won. Out-of-range weeks are ignored.
    pub fn with_weeks_won(mut self, weeks: &[usize]) -> Self {
        for week in weeks {
            if let Some(flag) = week
                .checked_sub(1)
                .and_then(|index| self.weekly_winners.get_mut(index))
            {
                *flag = true;
            }
        }
        self
    }

    pub fn with_year_winner(mut self) -> Self {
        self.year_winner = true;
        self
    }

    pub fn weeks_won(&self) -> i32 {
        self.weekly_winners.iter().filter(|won| **won).count() as i32
    }
}
