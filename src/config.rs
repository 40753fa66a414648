//! Runtime configuration for the stats daemon.
//!
//! Values come from the environment, with the command line able to override
//! them. Nothing here is global: the loaded values are passed explicitly to
//! the service and the daemon.
//!
//! # Environment Variables
//! - `PICKEM_SEASON_CURRENT`: season label for "Season" metrics (default: "2425")
//! - `PICKEM_DAEMON_INTERVAL`: seconds between runs (default: 30)
//! - `PICKEM_DATABASE_URL`: full Postgres URL; takes precedence over the discrete settings
//! - `PICKEM_DB_HOST` (default: "localhost"), `PICKEM_DB_PORT` (default: 5432),
//!   `PICKEM_DB_USER` (default: "postgres"), `PICKEM_DB_PASSWORD` (default: empty),
//!   `PICKEM_DB_NAME` (default: "pickem"), `PICKEM_DB_SSLMODE` (default: "disable")

use std::time::Duration;

use crate::stats::StatsError;

pub const DEFAULT_SEASON: &str = "2425";
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, StatsError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| StatsError::Validation(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Settings threaded through every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Season label used for the `*Season` metrics.
    pub current_season: String,
    /// Time between scheduled runs.
    pub interval: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            current_season: DEFAULT_SEASON.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl StatsConfig {
    pub fn from_env() -> Result<Self, StatsError> {
        let config = Self {
            current_season: env_or("PICKEM_SEASON_CURRENT", DEFAULT_SEASON),
            interval: Duration::from_secs(env_parsed(
                "PICKEM_DAEMON_INTERVAL",
                DEFAULT_INTERVAL_SECS,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, season: Option<String>, interval_secs: Option<u64>) -> Self {
        if let Some(season) = season {
            self.current_season = season;
        }
        if let Some(secs) = interval_secs {
            self.interval = Duration::from_secs(secs);
        }
        self
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.current_season.trim().is_empty() {
            return Err(StatsError::Validation(
                "current season must not be empty".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(StatsError::Validation(
                "daemon interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the website's Postgres database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "pickem".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, StatsError> {
        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("PICKEM_DATABASE_URL").ok(),
            host: env_or("PICKEM_DB_HOST", &defaults.host),
            port: env_parsed("PICKEM_DB_PORT", defaults.port)?,
            user: env_or("PICKEM_DB_USER", &defaults.user),
            password: env_or("PICKEM_DB_PASSWORD", &defaults.password),
            database: env_or("PICKEM_DB_NAME", &defaults.database),
            ssl_mode: env_or("PICKEM_DB_SSLMODE", &defaults.ssl_mode),
            max_connections: env_parsed("PICKEM_DB_MAX_CONNECTIONS", defaults.max_connections)?,
        })
    }
}
