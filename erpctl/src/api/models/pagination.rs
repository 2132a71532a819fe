//! Shared pagination and date-range types for API query parameters.
//!
//! All list endpoints use offset-based pagination with `skip` and `limit` parameters.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{Error, Result};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Standard pagination parameters for list endpoints.
///
/// The `limit` is clamped to ensure it's always between 1 and 100,
/// preventing both zero-result queries and excessive data fetching.
#[serde_as]
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

/// Generic paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

/// Inclusive calendar-day range used by reports and exports (`from=2025-03-01&to=2025-03-31`).
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct DateRange {
    /// First day included (UTC); defaults to 30 days before `to`
    pub from: Option<NaiveDate>,
    /// Last day included (UTC); defaults to today
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Half-open `[start, end)` instant bounds covering the requested days.
    pub fn bounds(&self, today: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let to = self.to.unwrap_or(today);
        let from = self.from.unwrap_or_else(|| to - chrono::Days::new(30));
        if from > to {
            return Err(Error::bad_request(format!("Invalid date range: {from} is after {to}")));
        }
        let start = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(&(to + chrono::Days::new(1)).and_time(NaiveTime::MIN));
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let p = Pagination::default();
        assert_eq!(p.skip(), 0);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_clamping() {
        let p = Pagination {
            skip: None,
            limit: Some(0),
        };
        assert_eq!(p.limit(), 1);

        let p = Pagination {
            skip: Some(-10),
            limit: Some(1000),
        };
        assert_eq!(p.params(), (0, MAX_LIMIT));
    }

    #[test]
    fn test_pagination_parses_from_query_strings() {
        let p: Pagination = serde_json::from_value(serde_json::json!({"skip": "20", "limit": "50"})).unwrap();
        assert_eq!(p.params(), (20, 50));
    }

    #[test]
    fn test_date_range_bounds() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: None,
        };
        let (start, end) = range.bounds(today).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-04-01T00:00:00+00:00");

        let default = DateRange::default().bounds(today).unwrap();
        assert_eq!(default.0.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let inverted = DateRange {
            from: NaiveDate::from_ymd_opt(2025, 4, 2),
            to: NaiveDate::from_ymd_opt(2025, 4, 1),
        };
        assert!(inverted.bounds(today).is_err());
    }
}
