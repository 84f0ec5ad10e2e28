//! Axis-aligned lon/lat bounding box.

use crate::{GeoError, Result};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A rectangle on the Earth's surface given by its min/max longitude and latitude.
///
/// Construction validates that every coordinate is finite, in range, and that
/// min < max on both axes, so a `BoundingBox` value is always usable as a query
/// region. Serialized as `[min_lon, min_lat, max_lon, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box, in the order min-lon, min-lat, max-lon, max-lat.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        check_coord("min_lon", min_lon, -180.0, 180.0)?;
        check_coord("min_lat", min_lat, -90.0, 90.0)?;
        check_coord("max_lon", max_lon, -180.0, 180.0)?;
        check_coord("max_lat", max_lat, -90.0, 90.0)?;

        if min_lon >= max_lon {
            return Err(GeoError::InvalidBounds {
                axis: "longitude",
                min: min_lon,
                max: max_lon,
            });
        }
        if min_lat >= max_lat {
            return Err(GeoError::InvalidBounds {
                axis: "latitude",
                min: min_lat,
                max: max_lat,
            });
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Create a bounding box from `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn from_coords(coords: [f64; 4]) -> Result<Self> {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    /// Minimum longitude (west edge).
    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    /// Minimum latitude (south edge).
    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Maximum longitude (east edge).
    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Maximum latitude (north edge).
    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Coordinates as `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn coords(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Center of the box as `(lat, lon)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Area enclosed by the box on a sphere of radius [`EARTH_RADIUS_M`], in m².
    ///
    /// Uses the lat/lon cell formula `R² · Δλ · (sin φ₂ − sin φ₁)`, which is
    /// exact for a spherical Earth.
    pub fn spherical_area_m2(&self) -> f64 {
        let d_lon = (self.max_lon - self.min_lon).to_radians();
        let d_sin = self.max_lat.to_radians().sin() - self.min_lat.to_radians().sin();
        EARTH_RADIUS_M * EARTH_RADIUS_M * d_lon * d_sin
    }

    /// Spherical area of the box in km².
    pub fn spherical_area_km2(&self) -> f64 {
        crate::m2_to_km2(self.spherical_area_m2())
    }

    /// Coordinates rounded to multiples of `step` degrees, for use as a lookup key.
    ///
    /// Rounded values are returned as integer step counts so that equal boxes
    /// compare equal and hash identically.
    pub fn quantized(&self, step: f64) -> [i64; 4] {
        self.coords().map(|c| (c / step).round() as i64)
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = GeoError;

    fn try_from(coords: [f64; 4]) -> Result<Self> {
        Self::from_coords(coords)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.coords()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

fn check_coord(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(GeoError::NonFinite { name });
    }
    if value < min || value > max {
        return Err(GeoError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centroid() {
        let bbox = BoundingBox::new(20.0, 52.0, 20.5, 52.5).unwrap();
        assert_eq!(bbox.centroid(), (52.25, 20.25));
    }

    #[test]
    fn test_coords_order() {
        let bbox = BoundingBox::from_coords([20.0, 52.0, 21.0, 53.0]).unwrap();
        assert_eq!(bbox.min_lon(), 20.0);
        assert_eq!(bbox.min_lat(), 52.0);
        assert_eq!(bbox.max_lon(), 21.0);
        assert_eq!(bbox.max_lat(), 53.0);
        assert_eq!(bbox.coords(), [20.0, 52.0, 21.0, 53.0]);
    }

    #[test]
    fn test_inverted_longitude_rejected() {
        let err = BoundingBox::new(21.0, 52.0, 20.0, 53.0).unwrap_err();
        assert!(matches!(err, GeoError::InvalidBounds { axis: "longitude", .. }));
    }

    #[test]
    fn test_degenerate_latitude_rejected() {
        let err = BoundingBox::new(20.0, 52.0, 21.0, 52.0).unwrap_err();
        assert!(matches!(err, GeoError::InvalidBounds { axis: "latitude", .. }));
    }

    #[test]
    fn test_out_of_range_and_nan_rejected() {
        assert!(matches!(
            BoundingBox::new(20.0, -91.0, 21.0, 53.0),
            Err(GeoError::OutOfRange { name: "min_lat", .. })
        ));
        assert!(matches!(
            BoundingBox::new(f64::NAN, 52.0, 21.0, 53.0),
            Err(GeoError::NonFinite { name: "min_lon" })
        ));
    }

    #[test]
    fn test_spherical_area() {
        // One degree cell between 52°N and 53°N.
        let bbox = BoundingBox::new(20.0, 52.0, 21.0, 53.0).unwrap();
        assert_relative_eq!(bbox.spherical_area_km2(), 7526.84, epsilon = 0.01);

        let small = BoundingBox::new(20.0, 52.0, 20.5, 52.5).unwrap();
        assert_relative_eq!(small.spherical_area_km2(), 1892.41, epsilon = 0.01);
    }

    #[test]
    fn test_quantized_absorbs_float_noise() {
        let a = BoundingBox::new(20.0, 52.0, 21.0, 53.0).unwrap();
        let b = BoundingBox::new(20.000_000_01, 52.0, 21.0, 52.999_999_99).unwrap();
        assert_eq!(a.quantized(1e-6), b.quantized(1e-6));

        let c = BoundingBox::new(20.001, 52.0, 21.0, 53.0).unwrap();
        assert_ne!(a.quantized(1e-6), c.quantized(1e-6));
    }

    #[test]
    fn test_serde_as_array() {
        let bbox = BoundingBox::new(20.0, 52.0, 21.0, 53.0).unwrap();
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[20.0,52.0,21.0,53.0]");

        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bbox);

        assert!(serde_json::from_str::<BoundingBox>("[21.0,52.0,20.0,53.0]").is_err());
    }
}
