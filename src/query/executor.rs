//! Query Executor — translates `(symbol, interval, table)` into a bounded,
//! ascending row set. The one place in the core that issues a scan against
//! a resolution table.

use crate::database::models::Candle;
use crate::database::repositories::CandleRepository;
use crate::errors::CoreError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Result of one scan: the rows actually returned (capped at `max_points`)
/// plus whether the underlying table held more than that.
pub struct QueryOutcome {
    pub candles: Vec<Candle>,
    pub truncated: bool,
}

pub struct QueryExecutor {
    repository: Arc<dyn CandleRepository>,
}

impl QueryExecutor {
    pub fn new(repository: Arc<dyn CandleRepository>) -> Self {
        Self { repository }
    }

    /// Scan `table` for `symbol` in the half-open interval `[start, end)`,
    /// reading at most `max_points + 1` rows so truncation can be detected
    /// without a second round trip.
    ///
    /// No retry here: `PoolTimeout`, `StoreUnavailable`, `Query`, and
    /// `RowDecode` all surface to the caller untouched. Smart Query is the
    /// one place that retries, and only on `PoolTimeout`.
    pub fn run(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        table: &str,
        max_points: i64,
    ) -> Result<QueryOutcome, CoreError> {
        if start >= end {
            return Err(CoreError::BadRequest("start must be before end".to_string()));
        }

        let mut candles = self.repository.scan(table, symbol, start, end, max_points + 1)?;

        let truncated = candles.len() as i64 > max_points;
        if truncated {
            candles.truncate(max_points as usize);
        }

        Ok(QueryOutcome { candles, truncated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FakeRepository {
        rows: Mutex<Vec<Candle>>,
    }

    fn candle(minute: i64) -> Candle {
        Candle {
            timestamp: DateTime::from_timestamp(minute * 60, 0).unwrap(),
            symbol: "EURUSD".to_string(),
            open: 1.1,
            high: 1.2,
            low: 1.0,
            close: 1.15,
            volume: 10.0,
            tick_count: Some(5),
            vwap: None,
            session: None,
        }
    }

    impl CandleRepository for FakeRepository {
        fn scan(
            &self,
            _table: &str,
            _symbol: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<Candle>, CoreError> {
            let rows = self.rows.lock();
            Ok(rows.iter().take(limit as usize).cloned().collect())
        }
    }

    #[test]
    fn rejects_a_non_half_open_interval() {
        let repo = Arc::new(FakeRepository { rows: Mutex::new(vec![]) });
        let executor = QueryExecutor::new(repo);
        let now = Utc::now();
        let result = executor.run("EURUSD", now, now, "ohlc_1h", 10);
        assert!(matches!(result, Err(CoreError::BadRequest(_))));
    }

    #[test]
    fn reports_truncation_when_the_cap_is_hit() {
        let rows: Vec<Candle> = (0..20).map(candle).collect();
        let repo = Arc::new(FakeRepository { rows: Mutex::new(rows) });
        let executor = QueryExecutor::new(repo);
        let start = Utc::now();
        let end = start + chrono::Duration::hours(1);

        let outcome = executor.run("EURUSD", start, end, "ohlc_1m", 10).unwrap();
        assert_eq!(outcome.candles.len(), 10);
        assert!(outcome.truncated);
    }

    #[test]
    fn reports_no_truncation_under_the_cap() {
        let rows: Vec<Candle> = (0..5).map(candle).collect();
        let repo = Arc::new(FakeRepository { rows: Mutex::new(rows) });
        let executor = QueryExecutor::new(repo);
        let start = Utc::now();
        let end = start + chrono::Duration::hours(1);

        let outcome = executor.run("EURUSD", start, end, "ohlc_1m", 10).unwrap();
        assert_eq!(outcome.candles.len(), 5);
        assert!(!outcome.truncated);
    }
}
