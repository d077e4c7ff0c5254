//! Resolution Catalog — a read-only registry mapping resolutions to their
//! storage table, recommended span, and point budget.
//!
//! Constructed once at startup from configuration (or the built-in default
//! table below) and never mutated afterwards. All other components hold
//! only shared references into it.

mod resolution;

pub use resolution::Resolution;

use crate::errors::CoreError;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Global cap on points returned per request, independent of resolution.
pub const MAX_POINTS_PER_REQUEST: i64 = 10_000;

/// One row of the Resolution Catalog, served verbatim at `/contract`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub resolution: Resolution,
    pub table: &'static str,
    pub min_span_secs: i64,
    pub max_span_secs: i64,
    pub max_points: i64,
    pub rationale: &'static str,
}

/// Read-only registry of resolutions, keyed for O(1) lookup.
///
/// Default table overridable via `data.resolutions` configuration; the
/// default matches spec.md §4.A exactly.
#[derive(Debug, Clone)]
pub struct ResolutionCatalog {
    by_resolution: HashMap<Resolution, CatalogEntry>,
    ordered: Vec<Resolution>,
}

impl Default for ResolutionCatalog {
    fn default() -> Self {
        Self::new(default_entries())
    }
}

impl ResolutionCatalog {
    /// Build a catalog from an explicit entry list, finest to coarsest.
    ///
    /// Used both for the built-in default and for `data.resolutions`
    /// configuration overrides.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let ordered = entries.iter().map(|e| e.resolution).collect();
        let by_resolution = entries.into_iter().map(|e| (e.resolution, e)).collect();
        Self { by_resolution, ordered }
    }

    /// Look up the catalog entry for a resolution id.
    pub fn get(&self, resolution: Resolution) -> Result<&CatalogEntry, CoreError> {
        self.by_resolution
            .get(&resolution)
            .ok_or_else(|| CoreError::UnknownResolution(resolution.to_string()))
    }

    /// Iterate entries finest to coarsest.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.ordered.iter().filter_map(|r| self.by_resolution.get(r))
    }

    /// The coarsest resolution in the catalog, used as the auto-select fallback.
    pub fn coarsest(&self) -> Resolution {
        *self.ordered.last().expect("catalog is never empty")
    }

    /// Effective max points for a resolution: the smaller of its own cap and
    /// the global per-request cap.
    pub fn effective_max_points(&self, resolution: Resolution) -> Result<i64, CoreError> {
        let entry = self.get(resolution)?;
        Ok(entry.max_points.min(MAX_POINTS_PER_REQUEST))
    }
}

fn default_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            resolution: Resolution::OneMinute,
            table: "ohlc_1m",
            min_span_secs: 3_600,
            max_span_secs: 86_400,
            max_points: 1_440,
            rationale: "intraday scalping",
        },
        CatalogEntry {
            resolution: Resolution::FiveMinutes,
            table: "ohlc_5m",
            min_span_secs: 14_400,
            max_span_secs: 604_800,
            max_points: 2_016,
            rationale: "short-term trading",
        },
        CatalogEntry {
            resolution: Resolution::FifteenMinutes,
            table: "ohlc_15m",
            min_span_secs: 43_200,
            max_span_secs: 2_592_000,
            max_points: 2_880,
            rationale: "day trading",
        },
        CatalogEntry {
            resolution: Resolution::ThirtyMinutes,
            table: "ohlc_30m",
            min_span_secs: 86_400,
            max_span_secs: 5_184_000,
            max_points: 2_880,
            rationale: "swing trading",
        },
        CatalogEntry {
            resolution: Resolution::OneHour,
            table: "ohlc_1h",
            min_span_secs: 172_800,
            max_span_secs: 7_776_000,
            max_points: 2_160,
            rationale: "position trading",
        },
        CatalogEntry {
            resolution: Resolution::FourHours,
            table: "ohlc_4h",
            min_span_secs: 604_800,
            max_span_secs: 31_536_000,
            max_points: 2_190,
            rationale: "trend analysis",
        },
        CatalogEntry {
            resolution: Resolution::OneDay,
            table: "ohlc_1d",
            min_span_secs: 2_592_000,
            max_span_secs: 157_680_000,
            max_points: 1_825,
            rationale: "long-term analysis",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_spec() {
        let catalog = ResolutionCatalog::default();
        let one_hour = catalog.get(Resolution::OneHour).unwrap();
        assert_eq!(one_hour.table, "ohlc_1h");
        assert_eq!(one_hour.max_points, 2_160);
        assert_eq!(one_hour.min_span_secs, 48 * 3_600);
        assert_eq!(one_hour.max_span_secs, 90 * 86_400);
    }

    #[test]
    fn min_span_never_exceeds_max_span() {
        let catalog = ResolutionCatalog::default();
        for entry in catalog.iter_ordered() {
            assert!(entry.min_span_secs <= entry.max_span_secs);
        }
    }

    #[test]
    fn unknown_lookup_fails() {
        let catalog = ResolutionCatalog::new(vec![]);
        assert!(catalog.get(Resolution::OneMinute).is_err());
    }

    #[test]
    fn effective_max_points_respects_global_cap() {
        let catalog = ResolutionCatalog::default();
        let effective = catalog.effective_max_points(Resolution::OneDay).unwrap();
        assert_eq!(effective, 1_825);
    }

    #[test]
    fn coarsest_is_one_day() {
        let catalog = ResolutionCatalog::default();
        assert_eq!(catalog.coarsest(), Resolution::OneDay);
    }

    #[test]
    fn ordered_iteration_is_finest_to_coarsest() {
        let catalog = ResolutionCatalog::default();
        let ids: Vec<Resolution> = catalog.iter_ordered().map(|e| e.resolution).collect();
        assert_eq!(ids, Resolution::ALL.to_vec());
    }
}
