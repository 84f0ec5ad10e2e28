//! # waterbox-geo
//!
//! Plain value types shared by the waterbox crates:
//! - [`BoundingBox`]: an axis-aligned lon/lat rectangle, validated on construction
//! - [`DateRange`]: a start/end pair of calendar dates
//! - unit helpers for turning square meters into square kilometers
//!
//! ## Example
//!
//! ```
//! use waterbox_geo::{BoundingBox, DateRange, m2_to_km2};
//! use chrono::NaiveDate;
//!
//! let bbox = BoundingBox::new(20.0, 52.0, 20.5, 52.5)?;
//! assert_eq!(bbox.centroid(), (52.25, 20.25));
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2021, 4, 2).unwrap(),
//!     NaiveDate::from_ymd_opt(2021, 4, 3).unwrap(),
//! )?;
//! assert_eq!(range.end_iso(), "2021-04-03");
//!
//! assert_eq!(m2_to_km2(5_000_000.0), 5.0);
//! # Ok::<(), waterbox_geo::GeoError>(())
//! ```

mod bbox;
mod date_range;
mod error;
mod units;

pub use bbox::{BoundingBox, EARTH_RADIUS_M};
pub use date_range::DateRange;
pub use error::GeoError;
pub use units::{m2_to_km2, SQUARE_METERS_PER_SQUARE_KILOMETER};

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeoError>;
