//! Data Manager — availability checks plus single-flight, deadline-bound
//! background fetches that fill gaps in locally materialized data.

mod availability;
mod external;
mod jobs;
mod worker;

pub use availability::AvailabilitySummary;
pub use external::{CandleGenerator, PgCandleGenerator, PgTickLoader, TickLoader};
pub use jobs::{FetchJob, JobStatus, OverallStatus, RegisterOutcome};

use availability::AvailabilityChecker;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jobs::JobTable;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::database::repositories::AvailabilityRepository;
use crate::errors::CoreError;

/// Snapshot returned by `ensure_data`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnsureDataOutcome {
    pub jobs_queued: usize,
    pub already_running: usize,
    pub days_to_fetch: usize,
    pub dropped_queue_full: usize,
    pub estimated_completion: Option<DateTime<Utc>>,
}

pub struct DataManagerConfig {
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub job_deadline: Duration,
    pub job_retention: ChronoDuration,
}

impl Default for DataManagerConfig {
    fn default() -> Self {
        Self {
            num_workers: 3,
            queue_capacity: 256,
            job_deadline: Duration::from_secs(600),
            job_retention: ChronoDuration::minutes(15),
        }
    }
}

pub struct DataManager {
    job_table: Arc<JobTable>,
    checker: AvailabilityChecker,
    /// `None` once `shutdown` has run; new fetches are no longer accepted,
    /// and dropping the last sender lets idle workers see a closed channel.
    queue: Mutex<Option<mpsc::Sender<worker::JobKey>>>,
    active_workers: Arc<AtomicU32>,
    num_workers: usize,
    job_deadline: Duration,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DataManager {
    pub fn new(
        availability_repository: Arc<dyn AvailabilityRepository>,
        loader: Arc<dyn TickLoader>,
        generator: Arc<dyn CandleGenerator>,
        config: DataManagerConfig,
    ) -> Arc<Self> {
        let job_table = Arc::new(JobTable::new(config.job_retention));
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let active_workers = Arc::new(AtomicU32::new(0));

        let workers = worker::spawn_workers(
            config.num_workers,
            rx,
            job_table.clone(),
            loader,
            generator,
            config.job_deadline,
            active_workers.clone(),
        );

        Arc::new(Self {
            job_table,
            checker: AvailabilityChecker::new(availability_repository),
            queue: Mutex::new(Some(tx)),
            active_workers,
            num_workers: config.num_workers,
            job_deadline: config.job_deadline,
            workers: Mutex::new(workers),
        })
    }

    pub fn availability_check(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<AvailabilitySummary, CoreError> {
        self.checker.check(symbol, start, end)
    }

    /// Earliest/latest tick on record for `symbol`, backing `/data/range`.
    pub fn data_range(&self, symbol: &str) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), CoreError> {
        self.checker.full_range(symbol)
    }

    /// Fill every missing day bucket in `[start, end)` for `symbol`.
    /// Single-flight at the `(symbol, day)` granularity; see `JobTable::register`.
    /// Once `shutdown` has run, every gap day is reported as dropped rather
    /// than queued — there is no sender left to accept it.
    pub fn ensure_data(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<EnsureDataOutcome, CoreError> {
        let availability = self.checker.check(symbol, start, end)?;
        let days_to_fetch = availability.gap_days.len();

        let mut jobs_queued = 0;
        let mut already_running = 0;
        let mut dropped_queue_full = 0;

        let queue = self.queue.lock();
        for day in availability.gap_days {
            match self.job_table.register(symbol, day) {
                jobs::RegisterOutcome::AlreadyRunning => already_running += 1,
                jobs::RegisterOutcome::Created => {
                    let sent = queue.as_ref().map(|tx| tx.try_send((symbol.to_string(), day)));
                    match sent {
                        Some(Ok(())) => jobs_queued += 1,
                        _ => {
                            self.job_table.remove(symbol, day);
                            dropped_queue_full += 1;
                        }
                    }
                }
            }
        }
        drop(queue);

        let estimated_completion = if jobs_queued > 0 {
            let batches = (jobs_queued as f64 / self.num_workers.max(1) as f64).ceil() as i64;
            Some(Utc::now() + ChronoDuration::from_std(self.job_deadline).unwrap_or_default() * batches as i32)
        } else {
            None
        };

        Ok(EnsureDataOutcome {
            jobs_queued,
            already_running,
            days_to_fetch,
            dropped_queue_full,
            estimated_completion,
        })
    }

    pub fn job_status(&self, symbol: &str, day_bucket: DateTime<Utc>) -> Option<FetchJob> {
        self.job_table.status(symbol, day_bucket)
    }

    pub fn overall_status(&self) -> OverallStatus {
        let utilization = self.active_workers.load(Ordering::SeqCst) as f64 / self.num_workers.max(1) as f64;
        self.job_table.overall_status(utilization)
    }

    /// Spawn the retention-GC loop dropping terminal jobs past the
    /// retention window. Runs independently of the cache reaper.
    pub fn spawn_retention_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let dropped = self.job_table.sweep();
                if dropped > 0 {
                    tracing::debug!(dropped, "job retention sweep");
                }
            }
        })
    }

    /// Stop accepting new fetches and wait for in-flight jobs to finish,
    /// bounded by `job_deadline`. Idempotent: a second call finds the queue
    /// already closed and the worker list already drained.
    pub async fn shutdown(&self) {
        let sender = self.queue.lock().take();
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }

        let drain = async {
            for worker in workers {
                let _ = worker.await;
            }
        };

        if tokio::time::timeout(self.job_deadline, drain).await.is_err() {
            tracing::warn!(deadline_secs = self.job_deadline.as_secs(), "worker drain exceeded deadline; giving up on remaining jobs");
        }
    }
}
