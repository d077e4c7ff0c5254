//! Smart Query — composes the Planner, Cache, and Query Executor into the
//! single externally-exposed candle operation, plus its lazy-load variant
//! that nudges the Data Manager when local data looks thin.

use crate::cache::{fingerprint, Cache, CacheTtlPolicy, TtlClass};
use crate::catalog::Resolution;
use crate::database::models::Candle;
use crate::errors::CoreError;
use crate::manager::{DataManager, EnsureDataOutcome};
use crate::planner::ResolutionPlanner;
use crate::query::QueryExecutor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Below this fraction of the Planner's `estimated_points`, a non-empty
/// result is still treated as suspiciously thin and triggers a lazy fetch.
const LAZY_FETCH_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CandleMetadata {
    pub table_used: String,
    pub query_time_ms: u64,
    pub cache_hit: bool,
    pub points_returned: usize,
    pub max_points: i64,
    pub data_complete: bool,
    pub data_source: &'static str,
    pub server_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,
    pub time_range_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_fetch_triggered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_outcome: Option<EnsureDataOutcome>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CandleResponse {
    pub symbol: String,
    pub resolution: Resolution,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: usize,
    pub candles: Vec<Candle>,
    pub metadata: CandleMetadata,
}

/// Reject anything that isn't a short run of uppercase letters/digits.
/// The core has no symbol registry of its own to validate against at this
/// layer; `/symbols` is the authoritative list.
pub fn is_known_symbol_format(symbol: &str) -> bool {
    (3..=12).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

pub struct SmartQuery {
    planner: ResolutionPlanner,
    executor: QueryExecutor,
    cache: Arc<Cache<CandleResponse>>,
    cache_max_size_hint: usize,
    ttl_policy: CacheTtlPolicy,
}

impl SmartQuery {
    pub fn new(planner: ResolutionPlanner, executor: QueryExecutor, cache: Arc<Cache<CandleResponse>>) -> Self {
        Self::with_ttl_policy(planner, executor, cache, CacheTtlPolicy::default())
    }

    pub fn with_ttl_policy(
        planner: ResolutionPlanner,
        executor: QueryExecutor,
        cache: Arc<Cache<CandleResponse>>,
        ttl_policy: CacheTtlPolicy,
    ) -> Self {
        Self {
            planner,
            executor,
            cache,
            cache_max_size_hint: 1,
            ttl_policy,
        }
    }

    /// Expose the Planner's rationale directly, for `/candles/explain`.
    pub fn plan(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: Option<Resolution>,
    ) -> Result<crate::planner::ExplainPlan, CoreError> {
        self.planner.plan(symbol, start, end, resolution)
    }

    /// Steps 1-7 of the public candle operation: validate, plan, cache
    /// lookup, execute on miss, cache insert, return.
    pub fn candles(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>, resolution: Option<Resolution>) -> Result<CandleResponse, CoreError> {
        if start >= end {
            return Err(CoreError::BadRequest("start must be before end".to_string()));
        }
        if !is_known_symbol_format(symbol) {
            return Err(CoreError::BadRequest(format!("unrecognized symbol format: {symbol}")));
        }

        let plan = self.planner.plan(symbol, start, end, resolution)?;
        let key = fingerprint(symbol, plan.chosen_resolution, start, end);

        if let Some(mut cached) = self.cache.get(key) {
            cached.metadata.cache_hit = true;
            cached.metadata.query_time_ms = 0;
            cached.metadata.server_time = Utc::now();
            return Ok(cached);
        }

        let started = Instant::now();
        let outcome = self.run_with_retry(symbol, start, end, plan.table, plan.effective_max)?;
        let query_time_ms = started.elapsed().as_millis() as u64;

        let points_returned = outcome.candles.len();
        let data_complete = (points_returned as i64) < plan.effective_max;

        let next_url = if !data_complete {
            outcome.candles.last().map(|last| {
                let next_start = last.timestamp + chrono::Duration::seconds(1);
                format!(
                    "/api/v1/candles/smart?symbol={symbol}&start={}&end={}&resolution={}",
                    next_start.to_rfc3339(),
                    end.to_rfc3339(),
                    plan.chosen_resolution
                )
            })
        } else {
            None
        };

        let response = CandleResponse {
            symbol: symbol.to_string(),
            resolution: plan.chosen_resolution,
            start,
            end,
            count: points_returned,
            candles: outcome.candles,
            metadata: CandleMetadata {
                table_used: plan.table.to_string(),
                query_time_ms,
                cache_hit: false,
                points_returned,
                max_points: plan.effective_max,
                data_complete,
                data_source: "timescaledb",
                server_time: Utc::now(),
                next_url,
                time_range_ms: (end - start).num_milliseconds(),
                data_fetch_triggered: None,
                fetch_outcome: None,
            },
        };

        let ttl = TtlClass::classify(end, Utc::now()).ttl(&self.ttl_policy);
        self.cache.set(key, response.clone(), ttl, self.cache_max_size_hint);

        Ok(response)
    }

    /// `candles` plus a lazy nudge to the Data Manager when the result looks
    /// thin relative to what the Planner expected. Never blocks on the fetch.
    pub fn candles_lazy(
        &self,
        data_manager: &DataManager,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: Option<Resolution>,
    ) -> Result<CandleResponse, CoreError> {
        let mut response = self.candles(symbol, start, end, resolution)?;

        let plan = self.planner.plan(symbol, start, end, resolution)?;
        let suspiciously_low = plan.estimated_points > 0
            && (response.count as f64) < (plan.estimated_points as f64) * LAZY_FETCH_THRESHOLD;

        if response.count == 0 || suspiciously_low {
            let fetch_outcome = data_manager.ensure_data(symbol, start, end)?;
            response.metadata.data_fetch_triggered = Some(true);
            response.metadata.fetch_outcome = Some(fetch_outcome);
        }

        Ok(response)
    }

    fn run_with_retry(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        table: &str,
        max_points: i64,
    ) -> Result<crate::query::QueryOutcome, CoreError> {
        match self.executor.run(symbol, start, end, table, max_points) {
            Err(CoreError::PoolTimeout) => self.executor.run(symbol, start, end, table, max_points),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResolutionCatalog;
    use crate::database::repositories::{AvailabilityRepository, CandleRepository, TickRangeSummary};
    use crate::manager::{CandleGenerator, DataManagerConfig, TickLoader};
    use async_trait::async_trait;

    #[test]
    fn known_symbol_format() {
        assert!(is_known_symbol_format("EURUSD"));
        assert!(is_known_symbol_format("BTC"));
        assert!(!is_known_symbol_format("eurusd"));
        assert!(!is_known_symbol_format("EU"));
        assert!(!is_known_symbol_format("EUR-USD"));
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

    struct FakeCandleRepository {
        rows: Vec<Candle>,
    }

    impl CandleRepository for FakeCandleRepository {
        fn scan(&self, _table: &str, _symbol: &str, _start: DateTime<Utc>, _end: DateTime<Utc>, limit: i64) -> Result<Vec<Candle>, CoreError> {
            Ok(self.rows.iter().take(limit as usize).cloned().collect())
        }
    }

    fn smart_query(rows: Vec<Candle>) -> SmartQuery {
        let catalog = Arc::new(ResolutionCatalog::default());
        let planner = ResolutionPlanner::new(catalog);
        let executor = QueryExecutor::new(Arc::new(FakeCandleRepository { rows }));
        let cache = Arc::new(Cache::new(100));
        SmartQuery::new(planner, executor, cache)
    }

    #[test]
    fn scenario_a_second_identical_query_is_a_cache_hit() {
        let rows: Vec<Candle> = (0..10).map(candle).collect();
        let sq = smart_query(rows);
        let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2024-01-04T00:00:00Z".parse().unwrap();

        let first = sq.candles("EURUSD", start, end, Some(Resolution::OneHour)).unwrap();
        assert!(!first.metadata.cache_hit);

        let second = sq.candles("EURUSD", start, end, Some(Resolution::OneHour)).unwrap();
        assert!(second.metadata.cache_hit);
        assert_eq!(second.metadata.query_time_ms, 0);
    }

    #[test]
    fn scenario_c_truncated_result_reports_incomplete_with_a_next_url() {
        let rows: Vec<Candle> = (0..2_000).map(candle).collect();
        let sq = smart_query(rows);
        let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2024-01-02T00:00:00Z".parse().unwrap();

        let response = sq.candles("EURUSD", start, end, Some(Resolution::OneMinute)).unwrap();
        assert!(!response.metadata.data_complete);
        let next_url = response.metadata.next_url.expect("truncated response must carry a next_url");
        assert!(next_url.contains("symbol=EURUSD"));
        assert!(next_url.contains("resolution=1m"));
    }

    struct FakeAvailabilityRepository;

    impl AvailabilityRepository for FakeAvailabilityRepository {
        fn range_summary(&self, _symbol: &str, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<TickRangeSummary, CoreError> {
            Ok(TickRangeSummary { row_count_estimate: 0, earliest: None, latest: None })
        }

        fn has_rows_on_day(&self, _symbol: &str, _day_start: DateTime<Utc>) -> Result<bool, CoreError> {
            Ok(false)
        }
    }

    struct FakeTickLoader;

    #[async_trait]
    impl TickLoader for FakeTickLoader {
        async fn load(&self, _symbol: &str, _day: DateTime<Utc>) -> Result<(), CoreError> {
            Ok(())
        }
    }

    struct FakeCandleGenerator;

    #[async_trait]
    impl CandleGenerator for FakeCandleGenerator {
        async fn generate(&self, _symbol: &str, _day: DateTime<Utc>, _resolutions: &[Resolution]) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn scenario_d_lazy_query_nudges_the_data_manager_on_an_empty_result() {
        let sq = smart_query(vec![]);
        let data_manager = DataManager::new(
            Arc::new(FakeAvailabilityRepository),
            Arc::new(FakeTickLoader),
            Arc::new(FakeCandleGenerator),
            DataManagerConfig {
                num_workers: 1,
                queue_capacity: 8,
                job_deadline: std::time::Duration::from_secs(2),
                job_retention: chrono::Duration::minutes(1),
            },
        );

        let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2024-01-04T00:00:00Z".parse().unwrap();

        let response = sq.candles_lazy(&data_manager, "EURUSD", start, end, Some(Resolution::OneHour)).unwrap();
        assert_eq!(response.count, 0);
        assert_eq!(response.metadata.data_fetch_triggered, Some(true));
        let outcome = response.metadata.fetch_outcome.expect("lazy fetch must report an outcome");
        assert!(outcome.jobs_queued > 0);
    }
}
