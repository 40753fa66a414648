use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::StatsConfig,
    picks::{PickStore, UserEnumerator},
};

use super::{
    calculators::{
        CorrectPicksCalculator, MissedPicksCalculator, TeamFrequencyCalculator, WeeksWonCalculator,
    },
    repository::StatsRepository,
    CalculationContext, MetricCalculator, RunSummary, StatsError, StatsUpdate,
};

/// Email stored for users without an `account_emailaddress` record.
pub fn placeholder_email(user_id: &str) -> String {
    format!("user-{user_id}@placeholder.local")
}

#[derive(Debug, Default, Clone, Copy)]
struct UserOutcome {
    upserts: usize,
    failures: usize,
    skipped: usize,
}

/// Runs every calculator for every user and upserts each result.
pub struct StatsService {
    store: Arc<dyn PickStore>,
    repository: Arc<dyn StatsRepository>,
    enumerator: UserEnumerator,
    calculators: Vec<Arc<dyn MetricCalculator>>,
    config: StatsConfig,
}

impl StatsService {
    pub fn builder(
        store: Arc<dyn PickStore>,
        repository: Arc<dyn StatsRepository>,
    ) -> StatsServiceBuilder {
        StatsServiceBuilder::new(store, repository)
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn calculator_names(&self) -> Vec<&'static str> {
        self.calculators.iter().map(|c| c.name()).collect()
    }

    /// One full pass. Fails only when the store is unreachable at the start
    /// of the run; per-user and per-calculator failures are logged and
    /// counted in the summary.
    #[instrument(skip(self), fields(season = %self.config.current_season))]
    pub async fn run_once(&self) -> Result<RunSummary, StatsError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        self.store.ping().await?;
        let users = self.enumerator.distinct_users().await?;

        info!(run_id = %run_id, users = users.len(), "Starting stats run");

        let context = CalculationContext::new(&self.config.current_season);
        let mut totals = UserOutcome::default();

        for user_id in &users {
            match self.process_user(user_id, &context).await {
                Ok(outcome) => {
                    totals.upserts += outcome.upserts;
                    totals.failures += outcome.failures;
                    totals.skipped += outcome.skipped;
                }
                Err(err) if err.is_fatal() => {
                    error!(user_id = %user_id, error = %err, "Store lost mid-run, aborting");
                    return Err(err);
                }
                Err(err) => {
                    warn!(user_id = %user_id, error = %err, "Skipping user");
                    totals.failures += 1;
                }
            }
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            users: users.len(),
            upserts: totals.upserts,
            failures: totals.failures,
            skipped: totals.skipped,
        };

        info!(
            run_id = %run_id,
            users = summary.users,
            upserts = summary.upserts,
            failures = summary.failures,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed_ms(),
            "Stats run completed"
        );

        Ok(summary)
    }

    async fn process_user(
        &self,
        user_id: &str,
        context: &CalculationContext<'_>,
    ) -> Result<UserOutcome, StatsError> {
        let user_email = self.resolve_email(user_id).await?;
        let mut outcome = UserOutcome::default();

        for calculator in &self.calculators {
            let metrics = match calculator
                .calculate(self.store.as_ref(), user_id, context)
                .await
            {
                Ok(metrics) => metrics,
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        calculator = calculator.name(),
                        error = %err,
                        "Calculator failed"
                    );
                    outcome.failures += 1;
                    continue;
                }
            };

            if metrics.is_empty() {
                debug!(
                    user_id = %user_id,
                    calculator = calculator.name(),
                    "Nothing to store"
                );
                outcome.skipped += 1;
                continue;
            }

            let update = StatsUpdate::new(user_id, user_email.clone()).with_metrics(metrics);
            match self.repository.upsert(&update).await {
                Ok(()) => {
                    info!(
                        user_id = %user_id,
                        calculator = calculator.name(),
                        metrics = ?update.metrics.present_fields(),
                        "Stats upserted"
                    );
                    outcome.upserts += 1;
                }
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        calculator = calculator.name(),
                        error = %err,
                        "Upsert failed"
                    );
                    outcome.failures += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn resolve_email(&self, user_id: &str) -> Result<String, StatsError> {
        match self.store.user_email(user_id).await? {
            Some(email) => Ok(email),
            None => {
                let placeholder = placeholder_email(user_id);
                info!(
                    user_id = %user_id,
                    email = %placeholder,
                    "No email on record, using placeholder"
                );
                Ok(placeholder)
            }
        }
    }
}

pub struct StatsServiceBuilder {
    store: Arc<dyn PickStore>,
    repository: Arc<dyn StatsRepository>,
    calculators: Vec<Arc<dyn MetricCalculator>>,
    config: StatsConfig,
}

impl StatsServiceBuilder {
    fn new(store: Arc<dyn PickStore>, repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            store,
            repository,
            calculators: vec![
                Arc::new(CorrectPicksCalculator::new()),
                Arc::new(WeeksWonCalculator::new()),
                Arc::new(TeamFrequencyCalculator::most_picked()),
                Arc::new(TeamFrequencyCalculator::least_picked()),
                Arc::new(MissedPicksCalculator::new()),
            ],
            config: StatsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StatsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn MetricCalculator>) -> Self {
        self.calculators.push(calculator);
        self
    }

    /// Keeps only the calculators named in `names`. An empty list keeps all
    /// of them; an unknown name is rejected.
    pub fn only_calculators(mut self, names: &[String]) -> Result<Self, StatsError> {
        if names.is_empty() {
            return Ok(self);
        }

        let known: Vec<&'static str> = self.calculators.iter().map(|c| c.name()).collect();
        if let Some(unknown) = names.iter().find(|name| !known.contains(&name.as_str())) {
            return Err(StatsError::Validation(format!(
                "unknown calculator {unknown}, expected one of: {}",
                known.join(", ")
            )));
        }

        self.calculators
            .retain(|calculator| names.iter().any(|name| name == calculator.name()));
        Ok(self)
    }

    pub fn build(self) -> StatsService {
        StatsService {
            enumerator: UserEnumerator::new(self.store.clone()),
            store: self.store,
            repository: self.repository,
            calculators: self.calculators,
            config: self.config,
        }
    }
}
