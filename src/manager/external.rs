//! The two black-box store interfaces the Data Manager invokes. Both are
//! out of this core's scope per spec §6 — the core only calls them and
//! reacts to `ok`/`err`; the wire protocol and candle-generation math live
//! in the upstream ingestion system.

use crate::catalog::Resolution;
use crate::errors::CoreError;
use crate::pool::ConnectionPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::sql_types::{Array, Text, Timestamptz};
use diesel::RunQueryDsl;
use std::sync::Arc;
use std::time::Duration;

/// "Fetch ticks for (symbol, day) and write them to the tick store."
/// Expected to be idempotent; re-invoking for an already-loaded day is
/// wasteful but harmless.
#[async_trait]
pub trait TickLoader: Send + Sync {
    async fn load(&self, symbol: &str, day: DateTime<Utc>) -> Result<(), CoreError>;
}

/// "Produce/overwrite OHLC bars for (symbol, day) across the given
/// resolutions." Contract per spec §6: every bar whose window held at
/// least one tick exists exactly once; daily bars are labeled with the
/// UTC calendar day start.
#[async_trait]
pub trait CandleGenerator: Send + Sync {
    async fn generate(&self, symbol: &str, day: DateTime<Utc>, resolutions: &[Resolution]) -> Result<(), CoreError>;
}

/// Default `TickLoader`: invokes the ingestion pipeline's stored
/// procedure for one symbol/day. The wire protocol to whatever upstream
/// feed backs `load_tick_range` is genuinely out of this core's scope
/// (spec.md §1); this just crosses the one interface boundary the core
/// is allowed to know about — a SQL-callable entry point on the same
/// store the Query Executor reads from.
pub struct PgTickLoader {
    pool: Arc<ConnectionPool>,
    acquire_timeout: Duration,
}

impl PgTickLoader {
    pub fn new(pool: Arc<ConnectionPool>, acquire_timeout: Duration) -> Self {
        Self { pool, acquire_timeout }
    }
}

#[async_trait]
impl TickLoader for PgTickLoader {
    async fn load(&self, symbol: &str, day: DateTime<Utc>) -> Result<(), CoreError> {
        let pool = self.pool.clone();
        let acquire_timeout = self.acquire_timeout;
        let symbol = symbol.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.acquire(acquire_timeout)?;
            diesel::sql_query("SELECT load_tick_range($1, $2)")
                .bind::<Text, _>(&symbol)
                .bind::<Timestamptz, _>(day)
                .execute(&mut *conn)
                .map_err(CoreError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?
    }
}

/// Default `CandleGenerator`: invokes the ingestion pipeline's stored
/// procedure that rebuilds OHLC bars for one day across the named
/// resolutions, same rationale as `PgTickLoader`.
pub struct PgCandleGenerator {
    pool: Arc<ConnectionPool>,
    acquire_timeout: Duration,
}

impl PgCandleGenerator {
    pub fn new(pool: Arc<ConnectionPool>, acquire_timeout: Duration) -> Self {
        Self { pool, acquire_timeout }
    }
}

#[async_trait]
impl CandleGenerator for PgCandleGenerator {
    async fn generate(&self, symbol: &str, day: DateTime<Utc>, resolutions: &[Resolution]) -> Result<(), CoreError> {
        let pool = self.pool.clone();
        let acquire_timeout = self.acquire_timeout;
        let symbol = symbol.to_string();
        let resolution_ids: Vec<String> = resolutions.iter().map(|r| r.as_str().to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.acquire(acquire_timeout)?;
            diesel::sql_query("SELECT generate_candles($1, $2, $3)")
                .bind::<Text, _>(&symbol)
                .bind::<Timestamptz, _>(day)
                .bind::<Array<Text>, _>(&resolution_ids)
                .execute(&mut *conn)
                .map_err(CoreError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?
    }
}
