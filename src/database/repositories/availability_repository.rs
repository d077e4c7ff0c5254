//! Availability repository — the finest-resolution tick source queries that
//! back the Data Manager's availability check: range summary and per-day
//! presence, used to derive `gap_days`.

use crate::errors::CoreError;
use crate::pool::ConnectionPool;
use chrono::{DateTime, Utc};
use diesel::sql_types::{Nullable, Text, Timestamptz};
use diesel::{QueryableByName, RunQueryDsl};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TickRangeSummary {
    pub row_count_estimate: i64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

#[derive(QueryableByName)]
struct RangeRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    row_count: i64,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    earliest: Option<DateTime<Utc>>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    latest: Option<DateTime<Utc>>,
}

pub trait AvailabilityRepository: Send + Sync {
    /// `count`, `min(timestamp)`, `max(timestamp)` of ticks in `[start, end)`.
    fn range_summary(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TickRangeSummary, CoreError>;

    /// Whether at least one tick exists in the UTC calendar day starting at `day_start`.
    fn has_rows_on_day(&self, symbol: &str, day_start: DateTime<Utc>) -> Result<bool, CoreError>;
}

pub struct PgAvailabilityRepository {
    pool: Arc<ConnectionPool>,
    acquire_timeout: Duration,
}

impl PgAvailabilityRepository {
    pub fn new(pool: Arc<ConnectionPool>, acquire_timeout: Duration) -> Self {
        Self { pool, acquire_timeout }
    }
}

impl AvailabilityRepository for PgAvailabilityRepository {
    fn range_summary(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TickRangeSummary, CoreError> {
        let mut conn = self.pool.acquire(self.acquire_timeout)?;

        let row = diesel::sql_query(
            "SELECT COUNT(*) AS row_count, MIN(tick_time) AS earliest, MAX(tick_time) AS latest \
             FROM ticks WHERE symbol = $1 AND tick_time >= $2 AND tick_time < $3",
        )
        .bind::<Text, _>(symbol)
        .bind::<Timestamptz, _>(start)
        .bind::<Timestamptz, _>(end)
        .get_result::<RangeRow>(&mut *conn)
        .map_err(CoreError::from)?;

        Ok(TickRangeSummary {
            row_count_estimate: row.row_count,
            earliest: row.earliest,
            latest: row.latest,
        })
    }

    fn has_rows_on_day(&self, symbol: &str, day_start: DateTime<Utc>) -> Result<bool, CoreError> {
        let day_end = day_start + chrono::Duration::hours(24);
        let summary = self.range_summary(symbol, day_start, day_end)?;
        Ok(summary.row_count_estimate > 0)
    }
}
