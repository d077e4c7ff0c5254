//! Small response DTOs that don't belong to any one component — health,
//! the data contract, and aggregate stats. Per-component payloads
//! (`CandleResponse`, `ExplainPlan`, `AvailabilitySummary`, ...) are
//! defined where they're computed and reused here verbatim.

use crate::cache::CacheStats;
use crate::catalog::CatalogEntry;
use crate::pool::PoolStats;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataRangeResponse {
    pub symbol: String,
    pub start: Option<chrono::DateTime<chrono::Utc>>,
    pub end: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub pool: PoolStats,
    pub uptime_s: u64,
}

/// Performance targets served alongside the Resolution Catalog at
/// `/contract` — the numbers a client should expect if it respects the
/// catalog's recommended spans.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PerformanceTargets {
    pub max_points_per_request: i64,
    pub cache_hit_target_ms: u64,
    pub cache_miss_target_ms: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContractResponse {
    pub resolutions: Vec<CatalogEntry>,
    pub performance_targets: PerformanceTargets,
}
