use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{MetricValue, StatsMetrics, StatsUpdate, UserStats},
    StatsError,
};

/// Persistence of the per-user statistics row.
///
/// Callers must upsert sequentially per user; there is no optimistic
/// concurrency control.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn exists(&self, user_id: &str) -> Result<bool, StatsError>;
    async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StatsError>;

    /// Creates the row, generating its id. Absent metrics stay absent.
    async fn insert(&self, update: &StatsUpdate) -> Result<(), StatsError>;

    /// Overwrites only the metrics present in `update`.
    async fn update(&self, update: &StatsUpdate) -> Result<(), StatsError>;

    async fn upsert(&self, update: &StatsUpdate) -> Result<(), StatsError> {
        if update.user_id.is_empty() {
            return Err(StatsError::Validation("userID is required".to_string()));
        }

        if self.exists(&update.user_id).await? {
            self.update(update).await
        } else {
            self.insert(update).await
        }
    }
}

fn validate_insert(update: &StatsUpdate) -> Result<(), StatsError> {
    if update.user_id.is_empty() {
        return Err(StatsError::Validation("userID is required".to_string()));
    }
    if update.user_email.is_empty() {
        return Err(StatsError::Validation(format!(
            "userEmail is required to create stats for {}",
            update.user_id
        )));
    }
    Ok(())
}

fn require_fields(update: &StatsUpdate) -> Result<Vec<(&'static str, MetricValue)>, StatsError> {
    let fields = update.metrics.present_fields();
    if fields.is_empty() {
        return Err(StatsError::NoFieldsToUpdate {
            user_id: update.user_id.clone(),
        });
    }
    Ok(fields)
}

#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    rows: Arc<RwLock<HashMap<String, UserStats>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn exists(&self, user_id: &str) -> Result<bool, StatsError> {
        Ok(self.rows.read().await.contains_key(user_id))
    }

    async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StatsError> {
        Ok(self.rows.read().await.get(user_id).cloned())
    }

    #[instrument(skip(self, update), fields(user_id = %update.user_id))]
    async fn insert(&self, update: &StatsUpdate) -> Result<(), StatsError> {
        validate_insert(update)?;

        let mut rows = self.rows.write().await;
        if rows.contains_key(&update.user_id) {
            warn!("Stats row already exists in memory");
            return Err(StatsError::QueryFailed(format!(
                "stats row for {} already exists",
                update.user_id
            )));
        }
        rows.insert(update.user_id.clone(), UserStats::new(update));

        debug!("Inserted stats row in memory");
        Ok(())
    }

    #[instrument(skip(self, update), fields(user_id = %update.user_id))]
    async fn update(&self, update: &StatsUpdate) -> Result<(), StatsError> {
        require_fields(update)?;

        let mut rows = self.rows.write().await;
        let row = rows.get_mut(&update.user_id).ok_or_else(|| {
            StatsError::QueryFailed(format!("no stats row for {}", update.user_id))
        })?;

        if !update.user_email.is_empty() {
            row.user_email.clone_from(&update.user_email);
        }
        row.metrics.apply(&update.metrics);

        debug!("Updated stats row in memory");
        Ok(())
    }
}

/// PostgreSQL implementation writing `pickem_api_userstats`
pub struct PostgresStatsRepository {
    pool: PgPool,
}

impl PostgresStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const STATS_COLUMNS: &str = r#""id", "userID", "userEmail", "weeksWonSeason", "weeksWonTotal",
    "pickPercentSeason", "pickPercentTotal", "correctPickTotalSeason", "correctPickTotalTotal",
    "totalPicksSeason", "totalPicksTotal", "mostPickedSeason", "mostPickedTotal",
    "leastPickedSeason", "leastPickedTotal", "seasonsWon", "missedPicksSeason",
    "missedPicksTotal", "perfectWeeksSeason", "perfectWeeksTotal""#;

fn push_metric(query: &mut QueryBuilder<'_, Postgres>, value: MetricValue) {
    match value {
        MetricValue::Count(count) => query.push_bind(count),
        MetricValue::Teams(teams) => query.push_bind(teams),
    };
}

fn stats_from_row(row: &PgRow) -> Result<UserStats, sqlx::Error> {
    Ok(UserStats {
        id: row.try_get("id")?,
        user_id: row.try_get("userID")?,
        user_email: row.try_get("userEmail")?,
        metrics: StatsMetrics {
            weeks_won_season: row.try_get("weeksWonSeason")?,
            weeks_won_total: row.try_get("weeksWonTotal")?,
            pick_percent_season: row.try_get("pickPercentSeason")?,
            pick_percent_total: row.try_get("pickPercentTotal")?,
            correct_pick_total_season: row.try_get("correctPickTotalSeason")?,
            correct_pick_total_total: row.try_get("correctPickTotalTotal")?,
            total_picks_season: row.try_get("totalPicksSeason")?,
            total_picks_total: row.try_get("totalPicksTotal")?,
            most_picked_season: row.try_get("mostPickedSeason")?,
            most_picked_total: row.try_get("mostPickedTotal")?,
            least_picked_season: row.try_get("leastPickedSeason")?,
            least_picked_total: row.try_get("leastPickedTotal")?,
            seasons_won: row.try_get("seasonsWon")?,
            missed_picks_season: row.try_get("missedPicksSeason")?,
            missed_picks_total: row.try_get("missedPicksTotal")?,
            perfect_weeks_season: row.try_get("perfectWeeksSeason")?,
            perfect_weeks_total: row.try_get("perfectWeeksTotal")?,
        },
    })
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    #[instrument(skip(self))]
    async fn exists(&self, user_id: &str) -> Result<bool, StatsError> {
        let row = sqlx::query(
            r#"SELECT EXISTS(SELECT 1 FROM pickem_api_userstats WHERE "userID" = $1) AS present"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to check stats row");
            StatsError::QueryFailed(e.to_string())
        })?;

        Ok(row.get("present"))
    }

    #[instrument(skip(self))]
    async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StatsError> {
        let query =
            format!(r#"SELECT {STATS_COLUMNS} FROM pickem_api_userstats WHERE "userID" = $1"#);
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to fetch stats row");
                StatsError::QueryFailed(e.to_string())
            })?;

        row.as_ref()
            .map(stats_from_row)
            .transpose()
            .map_err(|e| StatsError::QueryFailed(e.to_string()))
    }

    #[instrument(skip(self, update), fields(user_id = %update.user_id))]
    async fn insert(&self, update: &StatsUpdate) -> Result<(), StatsError> {
        validate_insert(update)?;
        let fields = update.metrics.present_fields();

        let mut query = QueryBuilder::<Postgres>::new(
            r#"INSERT INTO pickem_api_userstats ("id", "userEmail", "userID""#,
        );
        for (column, _) in &fields {
            query.push(format!(r#", "{column}""#));
        }
        query.push(") VALUES (");
        query.push_bind(Uuid::new_v4());
        query.push(", ").push_bind(update.user_email.clone());
        query.push(", ").push_bind(update.user_id.clone());
        for (_, value) in fields {
            query.push(", ");
            push_metric(&mut query, value);
        }
        query.push(")");

        query.build().execute(&self.pool).await.map_err(|e| {
            warn!(error = %e, "Failed to insert stats row");
            StatsError::QueryFailed(e.to_string())
        })?;

        info!("Inserted new stats row");
        Ok(())
    }

    #[instrument(skip(self, update), fields(user_id = %update.user_id))]
    async fn update(&self, update: &StatsUpdate) -> Result<(), StatsError> {
        let fields = require_fields(update)?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE pickem_api_userstats SET ");
        if !update.user_email.is_empty() {
            query
                .push(r#""userEmail" = "#)
                .push_bind(update.user_email.clone())
                .push(", ");
        }
        for (index, (column, value)) in fields.into_iter().enumerate() {
            if index > 0 {
                query.push(", ");
            }
            query.push(format!(r#""{column}" = "#));
            push_metric(&mut query, value);
        }
        query
            .push(r#" WHERE "userID" = "#)
            .push_bind(update.user_id.clone());

        let result = query.build().execute(&self.pool).await.map_err(|e| {
            warn!(error = %e, "Failed to update stats row");
            StatsError::QueryFailed(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            warn!("Stats row vanished before update");
            return Err(StatsError::QueryFailed(format!(
                "no stats row for {}",
                update.user_id
            )));
        }

        info!("Updated stats row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_with(metrics: StatsMetrics) -> StatsUpdate {
        StatsUpdate::new("user-1", "user1@example.com").with_metrics(metrics)
    }

    #[tokio::test]
    async fn first_upsert_inserts_row_with_generated_id() {
        let repo = InMemoryStatsRepository::new();
        let update = update_with(StatsMetrics {
            weeks_won_total: Some(3),
            ..StatsMetrics::default()
        });

        repo.upsert(&update).await.unwrap();

        let row = repo.get_user_stats("user-1").await.unwrap().unwrap();
        assert_eq!(row.user_email, "user1@example.com");
        assert_eq!(row.metrics.weeks_won_total, Some(3));
        assert_eq!(row.metrics.pick_percent_total, None);
        assert!(!row.id.is_nil());
    }

    #[tokio::test]
    async fn upsert_preserves_fields_from_other_calculators() {
        let repo = InMemoryStatsRepository::new();
        repo.upsert(&update_with(StatsMetrics {
            weeks_won_total: Some(3),
            ..StatsMetrics::default()
        }))
        .await
        .unwrap();
        repo.upsert(&update_with(StatsMetrics {
            most_picked_total: Some("X".into()),
            ..StatsMetrics::default()
        }))
        .await
        .unwrap();

        let row = repo.get_user_stats("user-1").await.unwrap().unwrap();
        assert_eq!(row.metrics.weeks_won_total, Some(3));
        assert_eq!(row.metrics.most_picked_total.as_deref(), Some("X"));
        assert_eq!(repo.row_count().await, 1);
    }

    #[tokio::test]
    async fn repeated_upsert_is_idempotent() {
        let repo = InMemoryStatsRepository::new();
        let update = update_with(StatsMetrics {
            pick_percent_total: Some(61),
            least_picked_total: Some("A, B".into()),
            ..StatsMetrics::default()
        });

        repo.upsert(&update).await.unwrap();
        let once = repo.get_user_stats("user-1").await.unwrap().unwrap();
        repo.upsert(&update).await.unwrap();
        let twice = repo.get_user_stats("user-1").await.unwrap().unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn update_without_metrics_is_rejected() {
        let repo = InMemoryStatsRepository::new();
        repo.upsert(&update_with(StatsMetrics {
            seasons_won: Some(1),
            ..StatsMetrics::default()
        }))
        .await
        .unwrap();

        let result = repo.upsert(&update_with(StatsMetrics::default())).await;
        assert!(matches!(
            result,
            Err(StatsError::NoFieldsToUpdate { ref user_id }) if user_id == "user-1"
        ));
    }

    #[tokio::test]
    async fn insert_requires_email() {
        let repo = InMemoryStatsRepository::new();
        let update = StatsUpdate::new("user-1", "").with_metrics(StatsMetrics {
            seasons_won: Some(1),
            ..StatsMetrics::default()
        });

        let result = repo.upsert(&update).await;
        assert!(matches!(result, Err(StatsError::Validation(_))));
        assert_eq!(repo.row_count().await, 0);
    }

    #[tokio::test]
    async fn update_with_empty_email_keeps_stored_email() {
        let repo = InMemoryStatsRepository::new();
        repo.upsert(&update_with(StatsMetrics {
            seasons_won: Some(1),
            ..StatsMetrics::default()
        }))
        .await
        .unwrap();

        repo.upsert(&StatsUpdate::new("user-1", "").with_metrics(StatsMetrics {
            seasons_won: Some(2),
            ..StatsMetrics::default()
        }))
        .await
        .unwrap();

        let row = repo.get_user_stats("user-1").await.unwrap().unwrap();
        assert_eq!(row.user_email, "user1@example.com");
        assert_eq!(row.metrics.seasons_won, Some(2));
    }
}
