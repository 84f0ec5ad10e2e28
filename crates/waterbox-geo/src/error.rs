//! Error types for the geo crate.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while validating query inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// A coordinate is NaN or infinite.
    #[error("Coordinate {name} is not a finite number")]
    NonFinite {
        /// Which coordinate was rejected.
        name: &'static str,
    },

    /// A coordinate lies outside the valid lon/lat range.
    #[error("Coordinate {name}={value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Which coordinate was rejected.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Lower limit.
        min: f64,
        /// Upper limit.
        max: f64,
    },

    /// Minimum is not strictly below maximum on an axis.
    #[error("Invalid bounds on {axis} axis: min {min} must be less than max {max}")]
    InvalidBounds {
        /// "longitude" or "latitude".
        axis: &'static str,
        /// Minimum value given.
        min: f64,
        /// Maximum value given.
        max: f64,
    },

    /// Start date falls after end date.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvertedDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },
}
