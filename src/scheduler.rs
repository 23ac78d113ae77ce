use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::config::SchedulerConfig;
use crate::metrics;
use crate::pipeline::{CycleReport, OfferPipeline};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerStats {
    pub started: bool,
    pub running_cycle: bool,
    pub interval_secs: u64,
    pub completed_cycles: u64,
    pub skipped_ticks: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_external_id: Option<String>,
}

/// Shared by the timer job and manual triggers. Owns the single-flight slot.
#[derive(Clone)]
struct CycleRunner {
    pipeline: Arc<OfferPipeline>,
    slot: Arc<Mutex<()>>,
    stopping: Arc<AtomicBool>,
    stats: Arc<RwLock<SchedulerStats>>,
}

impl CycleRunner {
    async fn run_exclusive(&self) -> Result<CycleReport> {
        self.ensure_admitting()?;
        let _slot = self.slot.clone().try_lock_owned().map_err(|_| AppError::CycleBusy)?;
        // stop() may have finished between the first check and taking the slot
        self.ensure_admitting()?;

        let report = self.pipeline.run_cycle().await;

        let mut stats = self.stats.write().await;
        stats.completed_cycles += 1;
        stats.last_cycle_at = report.finished_at;
        if report.external_id.is_some() {
            stats.last_external_id = report.external_id.clone();
        }
        Ok(report)
    }

    fn ensure_admitting(&self) -> Result<()> {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(AppError::Internal("scheduler is stopping".to_string()));
        }
        Ok(())
    }

    async fn tick(&self) {
        match self.run_exclusive().await {
            Ok(report) => {
                tracing::debug!(external_id = ?report.external_id, "Scheduled poll cycle complete");
            }
            Err(AppError::CycleBusy) => {
                tracing::warn!("Previous poll cycle still running, skipping tick");
                metrics::cycle_skipped();
                self.stats.write().await.skipped_ticks += 1;
            }
            Err(e) => tracing::warn!(error = %e, "Tick ignored"),
        }
    }
}

pub struct OfferScheduler {
    scheduler: Mutex<Option<JobScheduler>>,
    runner: CycleRunner,
    interval: Duration,
}

impl OfferScheduler {
    pub fn new(pipeline: Arc<OfferPipeline>, config: &SchedulerConfig) -> Self {
        let stats = SchedulerStats {
            interval_secs: config.poll_interval_secs,
            ..Default::default()
        };

        Self {
            scheduler: Mutex::new(None),
            runner: CycleRunner {
                pipeline,
                slot: Arc::new(Mutex::new(())),
                stopping: Arc::new(AtomicBool::new(false)),
                stats: Arc::new(RwLock::new(stats)),
            },
            interval: config.poll_interval(),
        }
    }

    /// Registers the fixed-interval poll job. Calling it twice is a no-op;
    /// calling it after `stop` admits cycles again.
    pub async fn start(&self) -> Result<()> {
        let mut guard = self.scheduler.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

        let runner = self.runner.clone();
        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let runner = runner.clone();
            Box::pin(async move {
                runner.tick().await;
            })
        })
        .map_err(scheduler_error)?;

        scheduler.add(job).await.map_err(scheduler_error)?;
        self.runner.stopping.store(false, Ordering::SeqCst);
        scheduler.start().await.map_err(scheduler_error)?;
        *guard = Some(scheduler);

        self.runner.stats.write().await.started = true;
        tracing::info!(interval_secs = self.interval.as_secs(), "Offer scheduler started");
        Ok(())
    }

    /// Stops admitting cycles, then waits for the in-flight one to finish.
    pub async fn stop(&self) -> Result<()> {
        self.runner.stopping.store(true, Ordering::SeqCst);

        if let Some(mut scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown().await.map_err(scheduler_error)?;
        }

        let _slot = self.runner.slot.lock().await;
        self.runner.stats.write().await.started = false;
        tracing::info!("Offer scheduler stopped");
        Ok(())
    }

    /// `stop`, warning every `warn_every` while a cycle is still in flight.
    /// The cycle is never cut short.
    pub async fn shutdown(&self, warn_every: Duration) -> Result<()> {
        let waiting_since = std::time::Instant::now();
        let stop = self.stop();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                result = &mut stop => return result,
                _ = tokio::time::sleep(warn_every) => {
                    tracing::warn!(
                        waited_secs = waiting_since.elapsed().as_secs(),
                        "Still waiting for the running poll cycle to finish"
                    );
                }
            }
        }
    }

    /// Runs one cycle right away through the same single-flight slot.
    pub async fn trigger_now(&self) -> Result<CycleReport> {
        self.runner.run_exclusive().await
    }

    pub fn is_cycle_running(&self) -> bool {
        self.runner.slot.try_lock().is_err()
    }

    pub async fn stats(&self) -> SchedulerStats {
        let mut stats = self.runner.stats.read().await.clone();
        stats.running_cycle = self.is_cycle_running();
        stats
    }
}

fn scheduler_error(err: JobSchedulerError) -> AppError {
    AppError::Internal(format!("job scheduler: {}", err))
}
