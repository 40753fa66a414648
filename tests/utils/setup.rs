use std::sync::Arc;

use pickem_stats::{InMemoryPickStore, InMemoryStatsRepository, StatsConfig, StatsService};

use super::builders::PickHistoryBuilder;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: Arc<InMemoryPickStore>,
    pub repository: Arc<InMemoryStatsRepository>,
    pub service: Arc<StatsService>,
}

pub struct TestSetupBuilder {
    history: PickHistoryBuilder,
    emails: Vec<(String, String)>,
    season: String,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            history: PickHistoryBuilder::new(),
            emails: vec![],
            season: "2425".to_string(),
        }
    }

    pub fn with_history(mut self, history: PickHistoryBuilder) -> Self {
        self.history = history;
        self
    }

    pub fn with_email(mut self, user: &str, email: &str) -> Self {
        self.emails.push((user.to_string(), email.to_string()));
        self
    }

    pub fn with_season(mut self, season: &str) -> Self {
        self.season = season.to_string();
        self
    }

    pub fn build(self) -> TestSetup {
        let mut store = InMemoryPickStore::new()
            .with_picks(self.history.picks)
            .with_games(self.history.games)
            .with_season_points(self.history.season_points);
        for (user, email) in &self.emails {
            store = store.with_email(user, email);
        }

        let store = Arc::new(store);
        let repository = Arc::new(InMemoryStatsRepository::new());
        let config = StatsConfig {
            current_season: self.season,
            ..StatsConfig::default()
        };
        let service = StatsService::builder(store.clone(), repository.clone())
            .with_config(config)
            .build();

        TestSetup {
            store,
            repository,
            service: Arc::new(service),
        }
    }
}
