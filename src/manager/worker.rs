//! Fixed-size worker pool draining the fetch queue in FIFO order.
//!
//! Grounded on the teacher's background-task shape (`tokio::spawn` loops
//! with a shared handle), generalized from a single persistence loop to a
//! pool of N workers sharing one bounded queue.

use super::external::{CandleGenerator, TickLoader};
use super::jobs::JobTable;
use crate::catalog::Resolution;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

pub type JobKey = (String, DateTime<Utc>);

/// Spawn `num_workers` tasks pulling from the shared receiver. All workers
/// contend for the same `tokio::sync::Mutex`-guarded receiver so jobs are
/// still processed FIFO overall, just by whichever worker is free next.
pub fn spawn_workers(
    num_workers: usize,
    receiver: mpsc::Receiver<JobKey>,
    job_table: Arc<JobTable>,
    loader: Arc<dyn TickLoader>,
    generator: Arc<dyn CandleGenerator>,
    job_deadline: Duration,
    active_workers: Arc<AtomicU32>,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));

    (0..num_workers)
        .map(|id| {
            let receiver = receiver.clone();
            let job_table = job_table.clone();
            let loader = loader.clone();
            let generator = generator.clone();
            let active_workers = active_workers.clone();

            tokio::spawn(async move {
                loop {
                    let next = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };

                    let Some((symbol, day)) = next else {
                        tracing::info!(worker = id, "fetch queue closed, worker exiting");
                        break;
                    };

                    active_workers.fetch_add(1, Ordering::SeqCst);
                    run_job(&job_table, &*loader, &*generator, &symbol, day, job_deadline).await;
                    active_workers.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect()
}

async fn run_job(
    job_table: &JobTable,
    loader: &dyn TickLoader,
    generator: &dyn CandleGenerator,
    symbol: &str,
    day: DateTime<Utc>,
    job_deadline: Duration,
) {
    job_table.mark_running(symbol, day);

    let outcome = tokio::time::timeout(job_deadline, async {
        loader.load(symbol, day).await?;
        generator.generate(symbol, day, &Resolution::ALL).await
    })
    .await;

    match outcome {
        Ok(Ok(())) => job_table.mark_completed(symbol, day),
        Ok(Err(e)) => job_table.mark_failed(symbol, day, e.to_string()),
        Err(_) => job_table.mark_failed(symbol, day, "job deadline exceeded".to_string()),
    }
}
