//! Connection Pool — a bounded pool of long-lived connections to the
//! time-series store, with scoped acquisition and guaranteed release.
//!
//! Built on diesel's r2d2 integration the way `database/connection.rs` in
//! the original order-book service wires up its metadata/timeseries pools,
//! generalized to expose the acquire/release/ping/stats surface spec.md
//! §4.B requires.

use crate::errors::CoreError;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager, Pool};
use diesel::RunQueryDsl;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Snapshot of pool utilization for `/stats`.
#[derive(Debug, Clone, Copy, serde::Serialize, utoipa::ToSchema)]
pub struct PoolStats {
    pub in_use: u32,
    pub idle: u32,
    pub waiters: u32,
    pub max_conns: u32,
}

struct Counters {
    in_use: AtomicU32,
    waiters: AtomicU32,
}

/// Bounded connection pool to the time-series store.
///
/// `acquire` blocks up to `acquire_timeout`; on deadline exceeded it fails
/// with `CoreError::PoolTimeout`. Connections exceeding `max_lifetime` are
/// retired by r2d2 on release; `test_on_check_out` gives the 30s health
/// check its teeth — a connection that fails the check-out ping is dropped
/// rather than handed to the caller.
pub struct ConnectionPool {
    inner: PgPool,
    counters: Arc<Counters>,
    acquire_timeout: Duration,
    max_conns: u32,
}

impl ConnectionPool {
    /// Establish a pool against `database_url`, with `min_conns`..=`max_conns`
    /// live connections and the given per-connection lifetime cap.
    pub fn establish(
        database_url: &str,
        min_conns: u32,
        max_conns: u32,
        max_lifetime: Duration,
        acquire_timeout: Duration,
    ) -> Result<Self, CoreError> {
        tracing::info!(max_conns, min_conns, "establishing connection pool");

        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let inner = r2d2::Pool::builder()
            .min_idle(Some(min_conns))
            .max_size(max_conns)
            .max_lifetime(Some(max_lifetime))
            .connection_timeout(acquire_timeout)
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(Self {
            inner,
            counters: Arc::new(Counters {
                in_use: AtomicU32::new(0),
                waiters: AtomicU32::new(0),
            }),
            acquire_timeout,
            max_conns,
        })
    }

    /// Acquire a connection, blocking up to `deadline`. Released on drop of
    /// the returned guard regardless of the caller's exit path.
    pub fn acquire(&self, deadline: Duration) -> Result<PooledGuard<'_>, CoreError> {
        self.counters.waiters.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.get_timeout(deadline.min(self.acquire_timeout));
        self.counters.waiters.fetch_sub(1, Ordering::SeqCst);

        let conn = result.map_err(|_| CoreError::PoolTimeout)?;
        self.counters.in_use.fetch_add(1, Ordering::SeqCst);

        Ok(PooledGuard {
            conn: Some(conn),
            counters: &self.counters,
        })
    }

    /// Ping the store with a freshly-acquired connection.
    pub fn ping(&self) -> Result<(), CoreError> {
        let mut guard = self.acquire(self.acquire_timeout)?;
        diesel::sql_query("SELECT 1")
            .execute(&mut *guard)
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Current utilization snapshot.
    pub fn stats(&self) -> PoolStats {
        let in_use = self.counters.in_use.load(Ordering::SeqCst);
        PoolStats {
            in_use,
            idle: self.max_conns.saturating_sub(in_use),
            waiters: self.counters.waiters.load(Ordering::SeqCst),
            max_conns: self.max_conns,
        }
    }
}

/// Scoped connection handle. Decrements the in-use counter on drop; the
/// underlying `PooledConnection` returns itself to r2d2 on drop too, so
/// release happens on every exit path including panics that unwind through it.
pub struct PooledGuard<'a> {
    conn: Option<r2d2::PooledConnection<ConnectionManager<PgConnection>>>,
    counters: &'a Counters,
}

impl Deref for PooledGuard<'_> {
    type Target = PgConnection;
    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("guard used after drop")
    }
}

impl DerefMut for PooledGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("guard used after drop")
    }
}

impl Drop for PooledGuard<'_> {
    fn drop(&mut self) {
        self.conn.take();
        self.counters.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Spawn the 30s health-check loop. On failure the check is logged; the
/// actual connection discard is delegated to r2d2's `test_on_check_out`.
pub fn spawn_health_check(pool: Arc<ConnectionPool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let pool = pool.clone();
            let ping = tokio::task::spawn_blocking(move || pool.ping()).await;
            match ping {
                Ok(Ok(())) => tracing::debug!("pool health check ok"),
                Ok(Err(e)) => tracing::warn!(error = %e, "pool health check failed"),
                Err(e) => tracing::warn!(error = %e, "pool health check task panicked"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires a live DATABASE_URL"]
    fn establish_and_stats() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let pool = ConnectionPool::establish(&url, 1, 5, Duration::from_secs(1_800), Duration::from_secs(5))
            .expect("pool establish");
        let stats = pool.stats();
        assert_eq!(stats.max_conns, 5);
        assert_eq!(stats.in_use, 0);
    }

    #[test]
    #[ignore = "requires a live DATABASE_URL"]
    fn acquire_releases_on_drop() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let pool = ConnectionPool::establish(&url, 1, 5, Duration::from_secs(1_800), Duration::from_secs(5))
            .expect("pool establish");
        {
            let _guard = pool.acquire(Duration::from_secs(1)).expect("acquire");
            assert_eq!(pool.stats().in_use, 1);
        }
        assert_eq!(pool.stats().in_use, 0);
    }
}
