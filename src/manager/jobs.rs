//! FetchJob and the process-wide job table. Concurrency discipline lives
//! entirely here: `register` is the single-flight choke point, implemented
//! as one atomic `dashmap` entry operation rather than a lock-then-check.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FetchJob {
    pub symbol: String,
    pub day_bucket: DateTime<Utc>,
    pub status: JobStatus,
    pub registered_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl FetchJob {
    fn pending(symbol: String, day_bucket: DateTime<Utc>) -> Self {
        Self {
            symbol,
            day_bucket,
            status: JobStatus::Pending,
            registered_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

pub type JobKey = (String, DateTime<Utc>);

/// Outcome of a single-flight registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    AlreadyRunning,
}

/// Snapshot of job counts and queue health for `/data/status`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverallStatus {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub oldest_pending_age_secs: Option<i64>,
    pub worker_utilization: f64,
}

/// Process-wide `FetchJob` table, keyed by `(symbol, day_bucket)`.
///
/// Owned exclusively by the Data Manager; every external view is a snapshot
/// clone, never a live reference, per the ownership rule in spec §3.
pub struct JobTable {
    jobs: DashMap<JobKey, FetchJob>,
    retention: chrono::Duration,
}

impl JobTable {
    pub fn new(retention: chrono::Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            retention,
        }
    }

    /// Register a job for `(symbol, day_bucket)` unless one is already
    /// `pending` or `running`. A terminal job at the same key is replaced
    /// (clients re-requesting a failed or completed day get a fresh job).
    pub fn register(&self, symbol: &str, day_bucket: DateTime<Utc>) -> RegisterOutcome {
        let key = (symbol.to_string(), day_bucket);
        match self.jobs.entry(key) {
            Entry::Occupied(mut e) => {
                if e.get().is_terminal() {
                    e.insert(FetchJob::pending(symbol.to_string(), day_bucket));
                    RegisterOutcome::Created
                } else {
                    RegisterOutcome::AlreadyRunning
                }
            }
            Entry::Vacant(v) => {
                v.insert(FetchJob::pending(symbol.to_string(), day_bucket));
                RegisterOutcome::Created
            }
        }
    }

    pub fn mark_running(&self, symbol: &str, day_bucket: DateTime<Utc>) {
        if let Some(mut job) = self.jobs.get_mut(&(symbol.to_string(), day_bucket)) {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        }
    }

    pub fn mark_completed(&self, symbol: &str, day_bucket: DateTime<Utc>) {
        if let Some(mut job) = self.jobs.get_mut(&(symbol.to_string(), day_bucket)) {
            job.status = JobStatus::Completed;
            job.finished_at = Some(Utc::now());
        }
    }

    pub fn mark_failed(&self, symbol: &str, day_bucket: DateTime<Utc>, error: String) {
        if let Some(mut job) = self.jobs.get_mut(&(symbol.to_string(), day_bucket)) {
            job.status = JobStatus::Failed;
            job.finished_at = Some(Utc::now());
            job.error = Some(error);
        }
    }

    /// Roll back a registration that could not be enqueued (queue full).
    pub fn remove(&self, symbol: &str, day_bucket: DateTime<Utc>) {
        self.jobs.remove(&(symbol.to_string(), day_bucket));
    }

    pub fn status(&self, symbol: &str, day_bucket: DateTime<Utc>) -> Option<FetchJob> {
        self.jobs.get(&(symbol.to_string(), day_bucket)).map(|e| e.clone())
    }

    pub fn overall_status(&self, worker_utilization: f64) -> OverallStatus {
        let mut pending = 0;
        let mut running = 0;
        let mut completed = 0;
        let mut failed = 0;
        let mut oldest_pending: Option<DateTime<Utc>> = None;

        for entry in self.jobs.iter() {
            match entry.status {
                JobStatus::Pending => {
                    pending += 1;
                    oldest_pending = Some(match oldest_pending {
                        Some(existing) => existing.min(entry.registered_at),
                        None => entry.registered_at,
                    });
                }
                JobStatus::Running => running += 1,
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
            }
        }

        OverallStatus {
            pending,
            running,
            completed,
            failed,
            oldest_pending_age_secs: oldest_pending.map(|t| (Utc::now() - t).num_seconds()),
            worker_utilization,
        }
    }

    /// Drop terminal jobs past the retention window (~15 min).
    pub fn sweep(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let before = self.jobs.len();
        self.jobs.retain(|_, job| match job.finished_at {
            Some(finished_at) => finished_at > cutoff,
            None => true,
        });
        before - self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(offset * 86_400, 0).unwrap()
    }

    #[test]
    fn single_flight_registration() {
        let table = JobTable::new(chrono::Duration::minutes(15));
        assert_eq!(table.register("EURUSD", day(0)), RegisterOutcome::Created);
        assert_eq!(table.register("EURUSD", day(0)), RegisterOutcome::AlreadyRunning);
    }

    #[test]
    fn distinct_keys_both_register() {
        let table = JobTable::new(chrono::Duration::minutes(15));
        assert_eq!(table.register("EURUSD", day(0)), RegisterOutcome::Created);
        assert_eq!(table.register("GBPUSD", day(0)), RegisterOutcome::Created);
        assert_eq!(table.register("EURUSD", day(1)), RegisterOutcome::Created);
    }

    #[test]
    fn terminal_job_can_be_re_registered() {
        let table = JobTable::new(chrono::Duration::minutes(15));
        table.register("EURUSD", day(0));
        table.mark_running("EURUSD", day(0));
        table.mark_failed("EURUSD", day(0), "timeout".to_string());
        assert_eq!(table.register("EURUSD", day(0)), RegisterOutcome::Created);
    }

    #[test]
    fn sweep_drops_only_expired_terminal_jobs() {
        let table = JobTable::new(chrono::Duration::seconds(0));
        table.register("EURUSD", day(0));
        table.mark_running("EURUSD", day(0));
        table.mark_completed("EURUSD", day(0));
        table.register("GBPUSD", day(0));

        let dropped = table.sweep();
        assert_eq!(dropped, 1);
        assert!(table.status("EURUSD", day(0)).is_none());
        assert!(table.status("GBPUSD", day(0)).is_some());
    }
}
