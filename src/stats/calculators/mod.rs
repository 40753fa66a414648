mod correct_picks;
mod missed_picks;
mod team_frequency;
mod weeks_won;

pub use correct_picks::{CorrectPicksCalculator, PickAccuracy};
pub use missed_picks::{AttendanceSummary, MissedPicksCalculator};
pub use team_frequency::{PickExtremum, TeamFrequencyCalculator};
pub use weeks_won::WeeksWonCalculator;
