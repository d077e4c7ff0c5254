//! Candle repository — the Query Executor's one query shape: a bounded,
//! ascending scan of a resolution table for one symbol over a half-open
//! interval.
//!
//! Grounded on `ohlc_repository.rs`'s dynamic-view-name pattern: the table
//! name is resolution-dependent and comes from the Resolution Catalog, not
//! from diesel's static `table!` macro, so the query is built with `format!`.
//! The catalog, not the request, picks `table`, but `scan` still validates
//! it is a plain identifier before interpolating it — a final guard against
//! a misconfigured catalog entry, not against a hostile caller.

use crate::database::models::Candle;
use crate::errors::CoreError;
use crate::pool::ConnectionPool;
use chrono::{DateTime, Utc};
use diesel::sql_types::{BigInt, Text, Timestamptz};
use diesel::RunQueryDsl;
use std::sync::Arc;
use std::time::Duration;

/// Abstraction over "scan a table for a symbol's bars in `[start, end)`".
pub trait CandleRepository: Send + Sync {
    fn scan(
        &self,
        table: &str,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Candle>, CoreError>;
}

pub struct PgCandleRepository {
    pool: Arc<ConnectionPool>,
    acquire_timeout: Duration,
}

impl PgCandleRepository {
    pub fn new(pool: Arc<ConnectionPool>, acquire_timeout: Duration) -> Self {
        Self { pool, acquire_timeout }
    }
}

impl CandleRepository for PgCandleRepository {
    /// Reads `limit` rows ascending by timestamp, `start ≤ timestamp < end`.
    /// Callers pass `max_points + 1` as `limit` so the Executor can tell a
    /// genuinely-exhausted interval apart from one truncated by the cap.
    fn scan(
        &self,
        table: &str,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Candle>, CoreError> {
        validate_table_identifier(table)?;

        let mut conn = self.pool.acquire(self.acquire_timeout)?;

        let query = format!(
            "SELECT timestamp, symbol, open, high, low, close, volume, tick_count, vwap, session \
             FROM {table} \
             WHERE symbol = $1 AND timestamp >= $2 AND timestamp < $3 \
             ORDER BY timestamp ASC \
             LIMIT $4"
        );

        diesel::sql_query(query)
            .bind::<Text, _>(symbol)
            .bind::<Timestamptz, _>(start)
            .bind::<Timestamptz, _>(end)
            .bind::<BigInt, _>(limit)
            .load::<Candle>(&mut *conn)
            .map_err(CoreError::from)
    }
}

/// Guard against a resolution table name that isn't a plain SQL identifier
/// before it is interpolated into the scan. The Resolution Catalog is the
/// only source of `table`, so this should never trip in production; tripping
/// it means the catalog itself is misconfigured, not that a request is bad.
fn validate_table_identifier(table: &str) -> Result<(), CoreError> {
    let valid = !table.is_empty()
        && table.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(CoreError::Query(format!("not a valid table identifier: {table:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_table_name_that_is_not_a_plain_identifier() {
        assert!(validate_table_identifier("ohlc_1h").is_ok());
        assert!(validate_table_identifier("ohlc_1h; DROP TABLE users;--").is_err());
        assert!(validate_table_identifier("").is_err());
        assert!(validate_table_identifier("1h").is_err());
    }
}
