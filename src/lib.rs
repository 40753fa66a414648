// Library crate for the pick'em stats engine
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod daemon;
pub mod db;
pub mod picks;
pub mod stats;

// Re-export commonly used types for easier access in tests
pub use config::{DatabaseConfig, StatsConfig};
pub use daemon::StatsDaemon;
pub use picks::{
    GamePick, GameScore, InMemoryPickStore, PickStore, PostgresPickStore, SeasonPoints,
    SeasonScope, UserEnumerator,
};
pub use stats::{
    InMemoryStatsRepository, PostgresStatsRepository, StatsError, StatsMetrics, StatsRepository,
    StatsService, StatsUpdate, UserStats,
};
