use anyhow::Context;
use clap::{Parser, Subcommand};
use pickem_stats::{
    db, DatabaseConfig, PostgresPickStore, PostgresStatsRepository, StatsConfig, StatsDaemon,
    StatsService,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pickem-stats", version, about = "Pick'em user statistics aggregator")]
struct Cli {
    /// Season label used for the "Season" metrics
    #[arg(long, global = true)]
    season: Option<String>,

    /// Enable debug logging
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute and upsert stats for every user once, then exit
    Run {
        /// Run only this calculator (repeatable): correct_picks, weeks_won,
        /// most_picked, least_picked, missed_picks
        #[arg(long = "calculator", value_name = "NAME")]
        calculators: Vec<String>,
    },
    /// Recompute stats on a fixed interval until interrupted
    Daemon {
        /// Seconds between runs
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "pickem_stats=debug"
    } else {
        "pickem_stats=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let interval = match &cli.command {
        Command::Daemon { interval } => *interval,
        Command::Run { .. } => None,
    };
    let config = StatsConfig::from_env()
        .context("invalid stats configuration")?
        .with_overrides(cli.season.clone(), interval);
    config.validate().context("invalid stats configuration")?;

    let db_config = DatabaseConfig::from_env().context("invalid database configuration")?;
    let pool = db::connect(&db_config)
        .await
        .context("failed to connect to database")?;

    info!(season = %config.current_season, "Starting pick'em stats");

    let calculators = match &cli.command {
        Command::Run { calculators } => calculators.clone(),
        Command::Daemon { .. } => Vec::new(),
    };
    let service = StatsService::builder(
        Arc::new(PostgresPickStore::new(pool.clone())),
        Arc::new(PostgresStatsRepository::new(pool)),
    )
    .with_config(config)
    .only_calculators(&calculators)
    .context("invalid calculator selection")?
    .build();
    info!(calculators = ?service.calculator_names(), "Calculators enabled");

    match cli.command {
        Command::Run { .. } => {
            let summary = service.run_once().await.context("stats run failed")?;
            info!(
                users = summary.users,
                upserts = summary.upserts,
                failures = summary.failures,
                "Done"
            );
        }
        Command::Daemon { .. } => {
            let daemon = Arc::new(StatsDaemon::new(Arc::new(service)));
            let runner = daemon.clone();
            let handle = tokio::spawn(async move { runner.start().await });

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            info!("Shutdown requested, waiting for the current run");

            daemon.stop().await;
            if let Err(err) = handle.await {
                error!(error = %err, "Daemon task panicked");
            }
        }
    }

    Ok(())
}
