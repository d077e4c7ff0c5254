//! Availability check — summarizes what the tick source holds for a
//! `(symbol, interval)` and enumerates gap days.

use crate::database::repositories::AvailabilityRepository;
use crate::errors::CoreError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilitySummary {
    pub has_data: bool,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub gap_days: Vec<DateTime<Utc>>,
    pub row_count_estimate: i64,
}

/// Truncate to the UTC calendar day `[00:00:00Z, +24h)` containing `at`.
pub fn day_bucket(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Enumerate every UTC calendar day bucket touching `[start, end)`.
pub fn day_buckets(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut buckets = Vec::new();
    let mut cursor = day_bucket(start);
    while cursor < end {
        buckets.push(cursor);
        cursor += Duration::hours(24);
    }
    buckets
}

pub struct AvailabilityChecker {
    repository: Arc<dyn AvailabilityRepository>,
}

impl AvailabilityChecker {
    pub fn new(repository: Arc<dyn AvailabilityRepository>) -> Self {
        Self { repository }
    }

    /// Earliest/latest tick timestamp on record for `symbol`, with no gap
    /// enumeration — backs `/data/range`, which only wants the outer bounds.
    pub fn full_range(&self, symbol: &str) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), CoreError> {
        let epoch = DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now);
        let horizon = Utc::now() + Duration::days(3650);
        let summary = self.repository.range_summary(symbol, epoch, horizon)?;
        Ok((summary.earliest, summary.latest))
    }

    pub fn check(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<AvailabilitySummary, CoreError> {
        if start >= end {
            return Err(CoreError::BadRequest("start must be before end".to_string()));
        }

        let summary = self.repository.range_summary(symbol, start, end)?;

        let mut gap_days = Vec::new();
        for bucket in day_buckets(start, end) {
            if !self.repository.has_rows_on_day(symbol, bucket)? {
                gap_days.push(bucket);
            }
        }

        Ok(AvailabilitySummary {
            has_data: summary.row_count_estimate > 0,
            earliest: summary.earliest,
            latest: summary.latest,
            gap_days,
            row_count_estimate: summary.row_count_estimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_buckets_covers_a_three_day_span() {
        let start: DateTime<Utc> = "2024-03-04T12:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2024-03-06T06:00:00Z".parse().unwrap();
        let buckets = day_buckets(start, end);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].to_rfc3339(), "2024-03-04T00:00:00+00:00");
        assert_eq!(buckets[2].to_rfc3339(), "2024-03-06T00:00:00+00:00");
    }

    #[test]
    fn day_bucket_truncates_to_midnight_utc() {
        let at: DateTime<Utc> = "2024-03-04T17:42:10Z".parse().unwrap();
        assert_eq!(day_bucket(at).to_rfc3339(), "2024-03-04T00:00:00+00:00");
    }
}
