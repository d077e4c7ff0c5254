//! OpenAPI document for the `/contract` surface's typed sibling, served at
//! `/swagger-ui` via `utoipa-swagger-ui` — the teacher's documentation
//! stack (`api/openapi.rs`), pointed at this core's endpoints instead of
//! the order book's.

use utoipa::OpenApi;

use crate::catalog::{CatalogEntry, Resolution};
use crate::database::models::Candle;
use crate::manager::{AvailabilitySummary, EnsureDataOutcome, FetchJob, JobStatus, OverallStatus};
use crate::planner::{AlternativeResolution, ExplainPlan};
use crate::smart::{CandleMetadata, CandleResponse};

use super::handlers;
use super::responses::{ContractResponse, DataRangeResponse, HealthResponse, PerformanceTargets, StatsResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::candles_fixed,
        handlers::candles_smart,
        handlers::candles_lazy,
        handlers::candles_explain,
        handlers::symbols,
        handlers::timeframes,
        handlers::data_range,
        handlers::data_check,
        handlers::data_ensure,
        handlers::data_status,
        handlers::job_status,
        handlers::stats,
        handlers::stats_cache,
        handlers::contract,
    ),
    components(schemas(
        HealthResponse,
        DataRangeResponse,
        StatsResponse,
        ContractResponse,
        PerformanceTargets,
        CatalogEntry,
        Resolution,
        Candle,
        CandleResponse,
        CandleMetadata,
        ExplainPlan,
        AlternativeResolution,
        AvailabilitySummary,
        EnsureDataOutcome,
        OverallStatus,
        FetchJob,
        JobStatus,
        crate::cache::CacheStats,
        crate::pool::PoolStats,
    )),
    tags(
        (name = "candles", description = "Read-optimized OHLC candle queries"),
        (name = "data", description = "Availability checks and background fetch scheduling"),
        (name = "reference", description = "Static reference data: symbols, timeframes, the data contract"),
        (name = "ops", description = "Health and operational stats"),
    )
)]
pub struct ApiDoc;
