use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{GamePick, GameScore, SeasonPoints, SeasonScope, WEEKS_PER_SEASON};
use crate::stats::StatsError;

/// Read-only access to the raw pick, score and season-points records.
#[async_trait]
pub trait PickStore: Send + Sync {
    /// Cheap connectivity check, run before every pass.
    async fn ping(&self) -> Result<(), StatsError>;

    /// Every `uid` with at least one season-tagged pick. May contain duplicates.
    async fn pick_user_ids(&self) -> Result<Vec<String>, StatsError>;

    async fn user_email(&self, user_id: &str) -> Result<Option<String>, StatsError>;

    async fn picks_for_user(
        &self,
        user_id: &str,
        scope: &SeasonScope,
    ) -> Result<Vec<GamePick>, StatsError>;

    async fn scored_games(&self, scope: &SeasonScope) -> Result<Vec<GameScore>, StatsError>;

    async fn season_points_for_user(
        &self,
        user_id: &str,
        scope: &SeasonScope,
    ) -> Result<Vec<SeasonPoints>, StatsError>;
}

#[derive(Debug, Default)]
struct PickTables {
    picks: Vec<GamePick>,
    games: Vec<GameScore>,
    season_points: Vec<SeasonPoints>,
    emails: HashMap<String, String>,
}

/// In-memory implementation of PickStore for development and testing
///
/// Besides holding records it can simulate an unreachable store and
/// failing queries for a single scope, and counts the queries it serves.
#[derive(Debug)]
pub struct InMemoryPickStore {
    tables: RwLock<PickTables>,
    failing_scopes: RwLock<HashSet<SeasonScope>>,
    available: AtomicBool,
    queries: AtomicUsize,
}

impl Default for InMemoryPickStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPickStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(PickTables::default()),
            failing_scopes: RwLock::new(HashSet::new()),
            available: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn with_picks(mut self, picks: Vec<GamePick>) -> Self {
        self.tables.get_mut().picks.extend(picks);
        self
    }

    pub fn with_games(mut self, games: Vec<GameScore>) -> Self {
        self.tables.get_mut().games.extend(games);
        self
    }

    pub fn with_season_points(mut self, rows: Vec<SeasonPoints>) -> Self {
        self.tables.get_mut().season_points.extend(rows);
        self
    }

    pub fn with_email(mut self, user_id: &str, email: &str) -> Self {
        self.tables
            .get_mut()
            .emails
            .insert(user_id.to_string(), email.to_string());
        self
    }

    pub async fn insert_pick(&self, pick: GamePick) {
        self.tables.write().await.picks.push(pick);
    }

    /// Makes every query scoped to `scope` fail with `QueryFailed`.
    pub async fn fail_scope(&self, scope: SeasonScope) {
        self.failing_scopes.write().await.insert(scope);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of queries served so far, including failed ones.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn begin_query(&self, scope: Option<&SeasonScope>) -> Result<(), StatsError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(StatsError::QueryFailed("store is offline".to_string()));
        }
        if let Some(scope) = scope {
            if self.failing_scopes.read().await.contains(scope) {
                return Err(StatsError::QueryFailed(format!(
                    "simulated failure for scope {}",
                    scope.label()
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PickStore for InMemoryPickStore {
    async fn ping(&self) -> Result<(), StatsError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StatsError::StoreUnavailable("store is offline".to_string()))
        }
    }

    #[instrument(skip(self))]
    async fn pick_user_ids(&self) -> Result<Vec<String>, StatsError> {
        self.begin_query(None).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .picks
            .iter()
            .filter(|pick| pick.game_season.is_some())
            .map(|pick| pick.uid.clone())
            .collect())
    }

    async fn user_email(&self, user_id: &str) -> Result<Option<String>, StatsError> {
        self.begin_query(None).await?;
        Ok(self.tables.read().await.emails.get(user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn picks_for_user(
        &self,
        user_id: &str,
        scope: &SeasonScope,
    ) -> Result<Vec<GamePick>, StatsError> {
        self.begin_query(Some(scope)).await?;
        let tables = self.tables.read().await;
        let picks: Vec<GamePick> = tables
            .picks
            .iter()
            .filter(|pick| pick.uid == user_id && scope.includes(pick.game_season.as_deref()))
            .cloned()
            .collect();

        debug!(
            user_id = %user_id,
            scope = scope.label(),
            count = picks.len(),
            "Fetched picks from memory"
        );
        Ok(picks)
    }

    #[instrument(skip(self))]
    async fn scored_games(&self, scope: &SeasonScope) -> Result<Vec<GameScore>, StatsError> {
        self.begin_query(Some(scope)).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .games
            .iter()
            .filter(|game| game.game_scored && scope.includes(game.game_season.as_deref()))
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn season_points_for_user(
        &self,
        user_id: &str,
        scope: &SeasonScope,
    ) -> Result<Vec<SeasonPoints>, StatsError> {
        self.begin_query(Some(scope)).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .season_points
            .iter()
            .filter(|row| row.user_id == user_id && scope.includes(row.game_season.as_deref()))
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation reading the website's tables
pub struct PostgresPickStore {
    pool: PgPool,
}

impl PostgresPickStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_scope(query: &mut QueryBuilder<'_, Postgres>, column: &str, scope: &SeasonScope) {
        query.push(format!(" AND {column} IS NOT NULL"));
        if let SeasonScope::Season(label) = scope {
            query
                .push(format!(" AND {column} = "))
                .push_bind(label.clone());
        }
    }
}

fn query_failed(context: &str, error: sqlx::Error) -> StatsError {
    warn!(error = %error, "{}", context);
    StatsError::QueryFailed(format!("{context}: {error}"))
}

#[async_trait]
impl PickStore for PostgresPickStore {
    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), StatsError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database ping failed");
                StatsError::StoreUnavailable(e.to_string())
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn pick_user_ids(&self) -> Result<Vec<String>, StatsError> {
        debug!("Fetching distinct pick users from database");

        let rows = sqlx::query(
            "SELECT DISTINCT uid::text AS uid FROM pickem_api_gamepicks \
             WHERE gameseason IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to fetch distinct pick users", e))?;

        Ok(rows.iter().map(|row| row.get("uid")).collect())
    }

    #[instrument(skip(self))]
    async fn user_email(&self, user_id: &str) -> Result<Option<String>, StatsError> {
        let row = sqlx::query(
            "SELECT email FROM account_emailaddress WHERE user_id::text = $1 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to fetch user email", e))?;

        Ok(row.map(|row| row.get("email")))
    }

    #[instrument(skip(self))]
    async fn picks_for_user(
        &self,
        user_id: &str,
        scope: &SeasonScope,
    ) -> Result<Vec<GamePick>, StatsError> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT uid::text AS uid, "userID"::text AS user_id, COALESCE(pick, '') AS pick,
               COALESCE(pick_correct, false) AS pick_correct, gameseason::text AS gameseason,
               COALESCE(gameweek::text, '') AS gameweek, pick_game_id::text AS game_id
               FROM pickem_api_gamepicks WHERE uid::text = "#,
        );
        query.push_bind(user_id.to_string());
        Self::push_scope(&mut query, "gameseason", scope);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed("Failed to fetch picks", e))?;

        debug!(
            user_id = %user_id,
            scope = scope.label(),
            count = rows.len(),
            "Fetched picks from database"
        );

        Ok(rows
            .iter()
            .map(|row| GamePick {
                uid: row.get("uid"),
                user_id: row.get("user_id"),
                pick: row.get("pick"),
                pick_correct: row.get("pick_correct"),
                game_season: row.get("gameseason"),
                game_week: row.get("gameweek"),
                game_id: row.get("game_id"),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn scored_games(&self, scope: &SeasonScope) -> Result<Vec<GameScore>, StatsError> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT id::text AS game_id, gameseason::text AS gameseason,
               COALESCE(gameweek::text, '') AS gameweek
               FROM pickem_api_gamesandscores WHERE "gameScored" = true"#,
        );
        Self::push_scope(&mut query, "gameseason", scope);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed("Failed to fetch scored games", e))?;

        Ok(rows
            .iter()
            .map(|row| GameScore {
                game_id: row.get("game_id"),
                game_season: row.get("gameseason"),
                game_week: row.get("gameweek"),
                game_scored: true,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn season_points_for_user(
        &self,
        user_id: &str,
        scope: &SeasonScope,
    ) -> Result<Vec<SeasonPoints>, StatsError> {
        let week_columns: Vec<String> = (1..=WEEKS_PER_SEASON)
            .map(|week| format!("COALESCE(week_{week}_winner, false) AS week_{week}_winner"))
            .collect();

        let mut query = QueryBuilder::<Postgres>::new(format!(
            r#"SELECT "userID"::text AS user_id, gameseason::text AS gameseason, {},
               COALESCE(year_winner, false) AS year_winner
               FROM pickem_api_userseasonpoints WHERE "userID"::text = "#,
            week_columns.join(", ")
        ));
        query.push_bind(user_id.to_string());
        Self::push_scope(&mut query, "gameseason", scope);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed("Failed to fetch season points", e))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut weekly_winners = [false; WEEKS_PER_SEASON];
            for (index, flag) in weekly_winners.iter_mut().enumerate() {
                *flag = row
                    .try_get(format!("week_{}_winner", index + 1).as_str())
                    .map_err(|e| query_failed("Failed to decode season points", e))?;
            }
            points.push(SeasonPoints {
                user_id: row.get("user_id"),
                game_season: row.get("gameseason"),
                weekly_winners,
                year_winner: row.get("year_winner"),
            });
        }
        Ok(points)
    }
}
