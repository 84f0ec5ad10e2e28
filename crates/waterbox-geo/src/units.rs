//! Area unit conversion.

/// Square meters in one square kilometer.
pub const SQUARE_METERS_PER_SQUARE_KILOMETER: f64 = 1e6;

/// Convert square meters to square kilometers.
pub fn m2_to_km2(square_meters: f64) -> f64 {
    square_meters / SQUARE_METERS_PER_SQUARE_KILOMETER
}
