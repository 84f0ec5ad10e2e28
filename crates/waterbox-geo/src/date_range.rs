//! Calendar date range used for temporal filtering.

use crate::{GeoError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A pair of calendar dates.
///
/// `start <= end` is enforced. Whether `end` itself is included is decided by
/// the service that applies the filter; Earth Engine treats it as exclusive,
/// so a range with `start == end` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a date range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(GeoError::InvertedDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Upper bound of the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Start formatted as `YYYY-MM-DD`.
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// End formatted as `YYYY-MM-DD`.
    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_range() {
        let range = DateRange::new(date(2021, 4, 2), date(2021, 4, 3)).unwrap();
        assert_eq!(range.start_iso(), "2021-04-02");
        assert_eq!(range.end_iso(), "2021-04-03");
        assert_eq!(range.to_string(), "2021-04-02..2021-04-03");
    }

    #[test]
    fn test_same_day_allowed() {
        let range = DateRange::new(date(2021, 4, 2), date(2021, 4, 2)).unwrap();
        assert_eq!(range.start(), range.end());
        assert_eq!(range.to_string(), "2021-04-02..2021-04-02");
    }

    #[test]
    fn test_inverted_rejected() {
        let err = DateRange::new(date(2021, 4, 3), date(2021, 4, 2)).unwrap_err();
        assert_eq!(
            err,
            GeoError::InvertedDateRange {
                start: date(2021, 4, 3),
                end: date(2021, 4, 2),
            }
        );
    }
}
