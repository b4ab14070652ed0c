use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::config::SchedulerConfig;
use crate::product_manager::{CycleReport, ProductManager};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub completed_runs: u64,
    pub skipped_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_report: Option<CycleReport>,
    pub uptime_seconds: u64,
}

/// Everything a job needs to run one cycle.
#[derive(Clone)]
struct CycleRunner {
    product_manager: Arc<ProductManager>,
    cycle_lock: Arc<Mutex<()>>,
    stats: Arc<RwLock<SchedulerStats>>,
}

impl CycleRunner {
    async fn run(&self) -> Option<CycleReport> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::warn!("Previous price check still running, skipping this tick");
            self.stats.write().await.skipped_runs += 1;
            return None;
        };

        let report = self.product_manager.check_all_products().await;

        let mut stats = self.stats.write().await;
        stats.completed_runs += 1;
        stats.last_run = Some(report.started_at);
        stats.last_report = Some(report.clone());

        Some(report)
    }

    fn repeating_job(&self, interval: Duration) -> std::result::Result<Job, JobSchedulerError> {
        let runner = self.clone();
        Job::new_repeated_async(interval, move |_uuid, _l| {
            let runner = runner.clone();
            Box::pin(async move {
                runner.run().await;
            })
        })
    }
}

/// Drives the periodic price check: one run after the initial delay, then one
/// per interval counted from that first run. Runs never overlap; a tick that
/// lands mid-cycle is skipped.
pub struct PriceCheckScheduler {
    scheduler: JobScheduler,
    config: SchedulerConfig,
    runner: CycleRunner,
    start_time: DateTime<Utc>,
}

impl PriceCheckScheduler {
    pub async fn new(product_manager: Arc<ProductManager>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config,
            runner: CycleRunner {
                product_manager,
                cycle_lock: Arc::new(Mutex::new(())),
                stats: Arc::new(RwLock::new(SchedulerStats::default())),
            },
            start_time: Utc::now(),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        let initial_delay = Duration::from_secs(self.config.initial_delay_secs);
        let interval = Duration::from_secs(self.config.interval_secs);

        // The repeating job is registered by the first run, so ticks land at
        // initial_delay + n * interval.
        let runner = self.runner.clone();
        let first_run = Job::new_one_shot_async(initial_delay, move |_uuid, scheduler| {
            let runner = runner.clone();
            Box::pin(async move {
                match runner.repeating_job(interval) {
                    Ok(job) => {
                        if let Err(e) = scheduler.add(job).await {
                            tracing::error!("Failed to schedule recurring price check: {:?}", e);
                        }
                    }
                    Err(e) => tracing::error!("Failed to build recurring price check: {:?}", e),
                }
                runner.run().await;
            })
        })?;

        self.scheduler.add(first_run).await?;
        self.scheduler.start().await?;

        tracing::info!(
            "Price check scheduler started: first run in {}s, then every {}s",
            self.config.initial_delay_secs,
            self.config.interval_secs
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        tracing::info!("Price check scheduler shutdown");
        Ok(())
    }

    /// Run a cycle outside the schedule. `None` when one is already running.
    pub async fn run_cycle_now(&self) -> Option<CycleReport> {
        tracing::info!("Running immediate price check");
        self.runner.run().await
    }

    pub fn is_cycle_running(&self) -> bool {
        self.runner.cycle_lock.try_lock().is_err()
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let mut stats = self.runner.stats.read().await.clone();
        let uptime = Utc::now().signed_duration_since(self.start_time);
        stats.uptime_seconds = uptime.num_seconds().max(0) as u64;
        stats
    }
}
