use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use crate::stats::StatsService;

/// Drives `StatsService::run_once` on a fixed cadence.
///
/// The first run starts immediately. Runs never overlap: a run that outlasts
/// the interval leaves at most one pending trigger, which fires as soon as
/// the run finishes.
pub struct StatsDaemon {
    service: Arc<StatsService>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
    stopped: watch::Sender<bool>,
    completed_runs: AtomicUsize,
}

impl StatsDaemon {
    pub fn new(service: Arc<StatsService>) -> Self {
        let interval = service.config().interval;
        Self::with_interval(service, interval)
    }

    pub fn with_interval(service: Arc<StatsService>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (stopped, _) = watch::channel(true);
        Self {
            service,
            interval,
            shutdown,
            stopped,
            completed_runs: AtomicUsize::new(0),
        }
    }

    /// Number of runs attempted so far, successful or not.
    pub fn completed_runs(&self) -> usize {
        self.completed_runs.load(Ordering::SeqCst)
    }

    /// Runs until `stop` is called. Returns immediately if it already was.
    #[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
    pub async fn start(&self) {
        self.stopped.send_replace(false);
        let mut shutdown_rx = self.shutdown.subscribe();
        if !*shutdown_rx.borrow_and_update() {
            self.run_loop(&mut shutdown_rx).await;
        }
        self.stopped.send_replace(true);
    }

    async fn run_loop(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        info!("Starting stats daemon");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow_and_update() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Shutdown is not polled while a run is in flight.
                    match self.service.run_once().await {
                        Ok(summary) => {
                            info!(
                                run_id = %summary.run_id,
                                users = summary.users,
                                "Scheduled run finished"
                            );
                        }
                        Err(err) => {
                            error!(error = %err, "Scheduled run failed");
                        }
                    }
                    self.completed_runs.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        info!(runs = self.completed_runs(), "Stats daemon stopped");
    }

    /// Signals shutdown and waits for an in-flight run to finish.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);

        let mut stopped_rx = self.stopped.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = stopped_rx.wait_for(|stopped| *stopped).await;
    }
}
