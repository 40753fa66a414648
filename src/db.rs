use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::stats::StatsError;

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, StatsError> {
    if let Some(url) = &config.url {
        return PgConnectOptions::from_str(url)
            .map_err(|e| StatsError::Validation(format!("invalid database url: {e}")));
    }

    let ssl_mode = PgSslMode::from_str(&config.ssl_mode)
        .map_err(|e| StatsError::Validation(format!("invalid ssl mode: {e}")))?;

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database)
        .ssl_mode(ssl_mode);
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    Ok(options)
}

/// Opens the shared pool and verifies the database answers.
#[instrument(skip(config), fields(host = %config.host, database = %config.database))]
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StatsError> {
    let options = connect_options(config)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to connect to database");
            StatsError::StoreUnavailable(e.to_string())
        })?;

    sqlx::query("SELECT 1").execute(&pool).await.map_err(|e| {
        warn!(error = %e, "Failed to ping database");
        StatsError::StoreUnavailable(e.to_string())
    })?;

    info!("Connected to database");
    Ok(pool)
}
