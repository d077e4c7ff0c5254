//! Resolution Planner — picks a resolution for an interval, bounds the
//! expected point count, and explains its reasoning.

use crate::catalog::{Resolution, ResolutionCatalog, MAX_POINTS_PER_REQUEST};
use crate::errors::CoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// One non-chosen resolution's candidacy, reported alongside the plan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlternativeResolution {
    pub resolution: Resolution,
    pub estimated_points: i64,
    pub recommended: bool,
}

/// The Planner's full reasoning for one request, served at `/candles/explain`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExplainPlan {
    pub symbol: String,
    pub duration_secs: i64,
    pub chosen_resolution: Resolution,
    pub table: &'static str,
    pub estimated_points: i64,
    pub effective_max: i64,
    pub rationale: &'static str,
    pub alternatives: Vec<AlternativeResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct ResolutionPlanner {
    catalog: Arc<ResolutionCatalog>,
}

impl ResolutionPlanner {
    pub fn new(catalog: Arc<ResolutionCatalog>) -> Self {
        Self { catalog }
    }

    /// Plan a request. `resolution = None` triggers auto-select: scan the
    /// catalog finest to coarsest and take the first whose recommended span
    /// contains the interval; if none fits, fall back to the coarsest.
    pub fn plan(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: Option<Resolution>,
    ) -> Result<ExplainPlan, CoreError> {
        if start >= end {
            return Err(CoreError::BadRequest("start must be before end".to_string()));
        }
        let duration_secs = (end - start).num_seconds();

        let (chosen, warning) = match resolution {
            Some(r) => {
                let entry = self.catalog.get(r)?;
                let warning = if duration_secs < entry.min_span_secs || duration_secs > entry.max_span_secs {
                    Some(format!(
                        "interval duration {}s is outside {}'s recommended span [{}, {}]s",
                        duration_secs, r, entry.min_span_secs, entry.max_span_secs
                    ))
                } else {
                    None
                };
                (r, warning)
            }
            None => (self.auto_select(duration_secs), None),
        };

        let entry = self.catalog.get(chosen)?;
        let estimated_points = div_ceil(duration_secs, chosen.duration_seconds());
        let effective_max = entry.max_points.min(MAX_POINTS_PER_REQUEST);

        let alternatives = self
            .catalog
            .iter_ordered()
            .filter(|e| e.resolution != chosen)
            .map(|e| AlternativeResolution {
                resolution: e.resolution,
                estimated_points: div_ceil(duration_secs, e.resolution.duration_seconds()),
                recommended: duration_secs >= e.min_span_secs && duration_secs <= e.max_span_secs,
            })
            .collect();

        Ok(ExplainPlan {
            symbol: symbol.to_string(),
            duration_secs,
            chosen_resolution: chosen,
            table: entry.table,
            estimated_points,
            effective_max,
            rationale: entry.rationale,
            alternatives,
            warning,
        })
    }

    fn auto_select(&self, duration_secs: i64) -> Resolution {
        self.catalog
            .iter_ordered()
            .find(|e| duration_secs >= e.min_span_secs && duration_secs <= e.max_span_secs)
            .map(|e| e.resolution)
            .unwrap_or_else(|| self.catalog.coarsest())
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn planner() -> ResolutionPlanner {
        ResolutionPlanner::new(Arc::new(ResolutionCatalog::default()))
    }

    #[test]
    fn scenario_a_mid_range_interval_picks_one_hour() {
        let planner = planner();
        let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2024-01-08T00:00:00Z".parse().unwrap();
        let plan = planner.plan("EURUSD", start, end, None).unwrap();
        assert_eq!(plan.chosen_resolution, Resolution::OneHour);
        assert_eq!(plan.table, "ohlc_1h");
        assert!(plan.estimated_points <= 168);
    }

    #[test]
    fn scenario_b_multi_year_range_picks_one_day() {
        let planner = planner();
        let start: DateTime<Utc> = "2020-01-01T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2024-12-31T00:00:00Z".parse().unwrap();
        let plan = planner.plan("EURUSD", start, end, None).unwrap();
        assert_eq!(plan.chosen_resolution, Resolution::OneDay);
        assert!((plan.estimated_points - 1826).abs() <= 2);

        let one_hour = plan
            .alternatives
            .iter()
            .find(|a| a.resolution == Resolution::OneHour)
            .unwrap();
        assert!(!one_hour.recommended);
        assert!(one_hour.estimated_points > 40_000);
    }

    #[test]
    fn unknown_resolution_fails() {
        let planner = planner();
        let catalog_empty = ResolutionPlanner::new(Arc::new(ResolutionCatalog::new(vec![])));
        let start = Utc::now();
        let end = start + Duration::hours(1);
        assert!(catalog_empty.plan("EURUSD", start, end, Some(Resolution::OneMinute)).is_err());
        // sanity: default catalog knows 1m
        assert!(planner.plan("EURUSD", start, end, Some(Resolution::OneMinute)).is_ok());
    }

    #[test]
    fn explicit_resolution_outside_its_span_warns_but_does_not_fail() {
        let planner = planner();
        let start = Utc::now();
        let end = start + Duration::days(400);
        let plan = planner.plan("EURUSD", start, end, Some(Resolution::OneMinute)).unwrap();
        assert_eq!(plan.chosen_resolution, Resolution::OneMinute);
        assert!(plan.warning.is_some());
    }

    #[test]
    fn monotonicity_a_subset_of_b_is_no_coarser() {
        let planner = planner();
        let start = Utc::now();
        let end_a = start + Duration::hours(6);
        let end_b = start + Duration::days(10);
        let plan_a = planner.plan("EURUSD", start, end_a, None).unwrap();
        let plan_b = planner.plan("EURUSD", start, end_b, None).unwrap();

        let rank = |r: Resolution| Resolution::ALL.iter().position(|x| *x == r).unwrap();
        assert!(rank(plan_a.chosen_resolution) <= rank(plan_b.chosen_resolution));
    }
}
