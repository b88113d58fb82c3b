//! Sold-date ranges and the incremental fetch planner
//!
//! The cache is keyed by sold date rather than by page number: page numbers
//! shift every time new sales are published, sold dates of past sales do
//! not. Given the span of dates a cache already covers, only the parts of a
//! request outside that span are fetched.

use crate::SlutprisError;
use chrono::{Days, NaiveDate};
use std::fmt;

/// Closed interval `[from, to]` of sold dates, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, SlutprisError> {
        if from > to {
            return Err(SlutprisError::InvalidDateRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Returns true if `date` lies within the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of days covered, counting both ends
    pub fn num_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Computes the sub-ranges of `requested` that must be fetched
///
/// * No cache span: the whole request.
/// * Otherwise `[from, cached.from - 1]` when the request starts before the
///   cache, and `[cached.to + 1, to]` when it ends after it. Both pieces run
///   all the way to the cache edge, even when the request itself stops
///   short of it, so the cache stays one contiguous span.
///
/// Dates strictly inside the cached span are never fetched again.
pub fn plan_fetch_ranges(requested: DateRange, cached: Option<DateRange>) -> Vec<DateRange> {
    let cached = match cached {
        Some(cached) => cached,
        None => return vec![requested],
    };

    let mut ranges = Vec::with_capacity(2);

    if requested.from < cached.from {
        if let Some(before) = cached.from.checked_sub_days(Days::new(1)) {
            ranges.push(DateRange {
                from: requested.from,
                to: before,
            });
        }
    }

    if requested.to > cached.to {
        if let Some(after) = cached.to.checked_add_days(Days::new(1)) {
            ranges.push(DateRange {
                from: after,
                to: requested.to,
            });
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(from: &str, to: &str) -> DateRange {
        DateRange::new(date(from), date(to)).unwrap()
    }

    #[test]
    fn test_no_cache_fetches_everything() {
        let requested = range("2023-06-01", "2023-06-30");
        assert_eq!(plan_fetch_ranges(requested, None), vec![requested]);
    }

    #[test]
    fn test_subset_of_cache_fetches_nothing() {
        let cached = range("2023-06-20", "2023-06-27");

        assert!(plan_fetch_ranges(range("2023-06-20", "2023-06-20"), Some(cached)).is_empty());
        assert!(plan_fetch_ranges(range("2023-06-22", "2023-06-25"), Some(cached)).is_empty());
        assert!(plan_fetch_ranges(cached, Some(cached)).is_empty());
    }

    #[test]
    fn test_superset_fetches_both_edges() {
        let cached = range("2023-06-20", "2023-06-27");
        let ranges = plan_fetch_ranges(range("2023-06-15", "2023-06-30"), Some(cached));

        assert_eq!(
            ranges,
            vec![range("2023-06-15", "2023-06-19"), range("2023-06-28", "2023-06-30")]
        );
    }

    #[test]
    fn test_overlap_on_one_side() {
        let cached = range("2023-06-20", "2023-06-27");

        assert_eq!(
            plan_fetch_ranges(range("2023-06-25", "2023-07-02"), Some(cached)),
            vec![range("2023-06-28", "2023-07-02")]
        );
        assert_eq!(
            plan_fetch_ranges(range("2023-06-10", "2023-06-21"), Some(cached)),
            vec![range("2023-06-10", "2023-06-19")]
        );
    }

    #[test]
    fn test_disjoint_request_extends_to_cache_edge() {
        let cached = range("2023-06-20", "2023-06-27");

        assert_eq!(
            plan_fetch_ranges(range("2023-06-01", "2023-06-05"), Some(cached)),
            vec![range("2023-06-01", "2023-06-19")]
        );
        assert_eq!(
            plan_fetch_ranges(range("2023-07-10", "2023-07-12"), Some(cached)),
            vec![range("2023-06-28", "2023-07-12")]
        );
    }

    #[test]
    fn test_invalid_range_rejected() {
        let result = DateRange::new(date("2023-06-02"), date("2023-06-01"));
        assert!(matches!(
            result,
            Err(SlutprisError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_contains_and_num_days() {
        let r = range("2023-06-20", "2023-06-27");
        assert!(r.contains(date("2023-06-20")));
        assert!(r.contains(date("2023-06-27")));
        assert!(!r.contains(date("2023-06-28")));
        assert_eq!(r.num_days(), 8);
    }
}
