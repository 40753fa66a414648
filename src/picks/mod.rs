// Raw pick, score and season-points records read by the calculators
pub use enumerator::UserEnumerator;
pub use models::{GamePick, GameScore, SeasonPoints, SeasonScope, WEEKS_PER_SEASON};
pub use store::{InMemoryPickStore, PickStore, PostgresPickStore};

mod enumerator;
pub mod models;
pub mod store;
