//! Per-endpoint handlers for the `/api/v1` HTTP surface in spec.md §6.
//!
//! Each handler does exactly three things: parse/validate its query
//! params into typed values, call the one core component that owns the
//! operation, and wrap the result in `Json`. Error conversion to HTTP
//! status codes is centralized in `crate::errors::CoreError`'s
//! `IntoResponse` impl, mirroring the teacher's `handlers.rs` shape.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog::Resolution;
use crate::errors::CoreError;
use crate::manager::{AvailabilitySummary, EnsureDataOutcome, FetchJob, OverallStatus};
use crate::planner::ExplainPlan;
use crate::smart::CandleResponse;

use super::responses::{ContractResponse, DataRangeResponse, HealthResponse, PerformanceTargets, StatsResponse};
use super::state::AppState;

fn parse_datetime(raw: &str, field: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CoreError::BadRequest(format!("{field} is not a valid RFC 3339 timestamp: {raw}")))
}

fn parse_resolution(raw: &str) -> Result<Resolution, CoreError> {
    Resolution::from_str(raw).ok_or_else(|| CoreError::UnknownResolution(raw.to_string()))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FixedCandleQuery {
    pub symbol: String,
    pub tf: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SmartCandleQuery {
    pub symbol: String,
    pub start: String,
    pub end: String,
    pub resolution: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExplainQuery {
    pub symbol: String,
    pub start: String,
    pub end: String,
    pub resolution: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SymbolIntervalQuery {
    pub symbol: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SymbolQuery {
    pub symbol: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnsureDataRequest {
    pub symbol: String,
    pub start: String,
    pub end: String,
}

/// `GET /health` — always 200; orchestrators read the body, never the status.
#[utoipa::path(get, path = "/health", tag = "ops", responses((status = 200, body = HealthResponse)))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.pool.ping() {
        Ok(()) => "connected",
        Err(_) => "down",
    };
    Json(HealthResponse { status: "ok", database })
}

/// `GET /api/v1/candles?symbol&tf&start&end` — fixed resolution.
#[utoipa::path(
    get, path = "/api/v1/candles", tag = "candles",
    params(FixedCandleQuery),
    responses((status = 200, body = CandleResponse), (status = 400, description = "bad request"))
)]
pub async fn candles_fixed(
    State(state): State<AppState>,
    Query(q): Query<FixedCandleQuery>,
) -> Result<Json<CandleResponse>, CoreError> {
    let start = parse_datetime(&q.start, "start")?;
    let end = parse_datetime(&q.end, "end")?;
    let resolution = parse_resolution(&q.tf)?;
    let response = state.smart_query.candles(&q.symbol, start, end, Some(resolution))?;
    Ok(Json(response))
}

/// `GET /api/v1/candles/smart?symbol&start&end&resolution?` — auto resolution.
#[utoipa::path(
    get, path = "/api/v1/candles/smart", tag = "candles",
    params(SmartCandleQuery),
    responses((status = 200, body = CandleResponse), (status = 400, description = "bad request"))
)]
pub async fn candles_smart(
    State(state): State<AppState>,
    Query(q): Query<SmartCandleQuery>,
) -> Result<Json<CandleResponse>, CoreError> {
    let start = parse_datetime(&q.start, "start")?;
    let end = parse_datetime(&q.end, "end")?;
    let resolution = q.resolution.as_deref().map(parse_resolution).transpose()?;
    let response = state.smart_query.candles(&q.symbol, start, end, resolution)?;
    Ok(Json(response))
}

/// `GET /api/v1/candles/lazy?symbol&tf&start&end` — fixed resolution plus
/// a background fetch nudge when the result looks thin or empty.
#[utoipa::path(
    get, path = "/api/v1/candles/lazy", tag = "candles",
    params(FixedCandleQuery),
    responses((status = 200, body = CandleResponse), (status = 400, description = "bad request"))
)]
pub async fn candles_lazy(
    State(state): State<AppState>,
    Query(q): Query<FixedCandleQuery>,
) -> Result<Json<CandleResponse>, CoreError> {
    let start = parse_datetime(&q.start, "start")?;
    let end = parse_datetime(&q.end, "end")?;
    let resolution = parse_resolution(&q.tf)?;
    let response = state
        .smart_query
        .candles_lazy(&state.data_manager, &q.symbol, start, end, Some(resolution))?;
    Ok(Json(response))
}

/// `GET /api/v1/candles/explain?symbol&start&end&resolution?` — Planner rationale only.
#[utoipa::path(
    get, path = "/api/v1/candles/explain", tag = "candles",
    params(ExplainQuery),
    responses((status = 200, body = ExplainPlan), (status = 400, description = "bad request"))
)]
pub async fn candles_explain(
    State(state): State<AppState>,
    Query(q): Query<ExplainQuery>,
) -> Result<Json<ExplainPlan>, CoreError> {
    let start = parse_datetime(&q.start, "start")?;
    let end = parse_datetime(&q.end, "end")?;
    let resolution = q.resolution.as_deref().map(parse_resolution).transpose()?;
    let plan = state.smart_query.plan(&q.symbol, start, end, resolution)?;
    Ok(Json(plan))
}

/// `GET /api/v1/symbols`
#[utoipa::path(get, path = "/api/v1/symbols", tag = "reference", responses((status = 200, body = [String])))]
pub async fn symbols(State(state): State<AppState>) -> Result<Json<Vec<String>>, CoreError> {
    let symbols = state.symbol_repository.get_all()?.into_iter().map(|s| s.symbol).collect();
    Ok(Json(symbols))
}

/// `GET /api/v1/timeframes`
#[utoipa::path(get, path = "/api/v1/timeframes", tag = "reference", responses((status = 200, body = [String])))]
pub async fn timeframes(State(state): State<AppState>) -> Json<Vec<&'static str>> {
    Json(state.catalog.iter_ordered().map(|e| e.resolution.as_str()).collect())
}

/// `GET /api/v1/data/range?symbol`
#[utoipa::path(
    get, path = "/api/v1/data/range", tag = "data",
    params(SymbolQuery),
    responses((status = 200, body = DataRangeResponse))
)]
pub async fn data_range(
    State(state): State<AppState>,
    Query(q): Query<SymbolQuery>,
) -> Result<Json<DataRangeResponse>, CoreError> {
    let (start, end) = state.data_manager.data_range(&q.symbol)?;
    Ok(Json(DataRangeResponse { symbol: q.symbol, start, end }))
}

/// `GET /api/v1/data/check?symbol&start&end`
#[utoipa::path(
    get, path = "/api/v1/data/check", tag = "data",
    params(SymbolIntervalQuery),
    responses((status = 200, body = AvailabilitySummary))
)]
pub async fn data_check(
    State(state): State<AppState>,
    Query(q): Query<SymbolIntervalQuery>,
) -> Result<Json<AvailabilitySummary>, CoreError> {
    let start = parse_datetime(&q.start, "start")?;
    let end = parse_datetime(&q.end, "end")?;
    let summary = state.data_manager.availability_check(&q.symbol, start, end)?;
    Ok(Json(summary))
}

/// `POST /api/v1/data/ensure` — body `{symbol, start, end}`.
#[utoipa::path(
    post, path = "/api/v1/data/ensure", tag = "data",
    request_body = EnsureDataRequest,
    responses((status = 200, body = EnsureDataOutcome))
)]
pub async fn data_ensure(
    State(state): State<AppState>,
    Json(body): Json<EnsureDataRequest>,
) -> Result<Json<EnsureDataOutcome>, CoreError> {
    let start = parse_datetime(&body.start, "start")?;
    let end = parse_datetime(&body.end, "end")?;
    let outcome = state.data_manager.ensure_data(&body.symbol, start, end)?;
    Ok(Json(outcome))
}

/// `GET /api/v1/data/status`
#[utoipa::path(get, path = "/api/v1/data/status", tag = "data", responses((status = 200, body = OverallStatus)))]
pub async fn data_status(State(state): State<AppState>) -> Json<OverallStatus> {
    Json(state.data_manager.overall_status())
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct JobStatusQuery {
    pub symbol: String,
    pub day: String,
}

/// `GET /api/v1/data/jobs/status?symbol&day` — single job snapshot, used
/// by scenario tests that poll a specific `(symbol, day)` fetch.
#[utoipa::path(
    get, path = "/api/v1/data/jobs/status", tag = "data",
    params(JobStatusQuery),
    responses((status = 200, body = FetchJob), (status = 404, description = "no such job"))
)]
pub async fn job_status(
    State(state): State<AppState>,
    Query(q): Query<JobStatusQuery>,
) -> Result<Json<FetchJob>, CoreError> {
    let day = parse_datetime(&q.day, "day")?;
    state
        .data_manager
        .job_status(&q.symbol, day)
        .map(Json)
        .ok_or_else(|| CoreError::NotFound(format!("no job for {} on {}", q.symbol, day)))
}

/// `GET /api/v1/stats`
#[utoipa::path(get, path = "/api/v1/stats", tag = "ops", responses((status = 200, body = StatsResponse)))]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.cache.stats(),
        pool: state.pool.stats(),
        uptime_s: state.started_at.elapsed().as_secs(),
    })
}

/// `GET /api/v1/stats/cache`
#[utoipa::path(get, path = "/api/v1/stats/cache", tag = "ops", responses((status = 200, body = crate::cache::CacheStats)))]
pub async fn stats_cache(State(state): State<AppState>) -> Json<crate::cache::CacheStats> {
    Json(state.cache.stats())
}

/// `GET /api/v1/contract` — the Resolution Catalog plus performance targets.
#[utoipa::path(get, path = "/api/v1/contract", tag = "reference", responses((status = 200, body = ContractResponse)))]
pub async fn contract(State(state): State<AppState>) -> Json<ContractResponse> {
    Json(ContractResponse {
        resolutions: state.catalog.iter_ordered().cloned().collect(),
        performance_targets: PerformanceTargets {
            max_points_per_request: state.config.data.max_points,
            cache_hit_target_ms: 5,
            cache_miss_target_ms: 200,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_datetime_accepts_rfc3339() {
        let parsed = parse_datetime("2024-01-01T00:00:00Z", "start").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn parse_datetime_rejects_garbage() {
        let err = parse_datetime("not-a-date", "start").unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
    }

    #[test]
    fn parse_resolution_accepts_known_codes() {
        assert_eq!(parse_resolution("1h").unwrap(), Resolution::OneHour);
        assert_eq!(parse_resolution("1d").unwrap(), Resolution::OneDay);
    }

    #[test]
    fn parse_resolution_rejects_unknown_codes() {
        let err = parse_resolution("7m").unwrap_err();
        assert!(matches!(err, CoreError::UnknownResolution(_)));
    }
}
