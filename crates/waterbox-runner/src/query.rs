//! Water area queries.
//!
//! A query filters the classified collection to images intersecting the box
//! within the date range, takes the first one, multiplies its water band by the
//! per-pixel area and sums the result over the box on the server. Locally only
//! the returned scalar is handled.
//!
//! The empty case is explicit: the size of the filtered collection is asked for
//! first, and a zero count or a null sum yields [`QueryOutcome::NotFound`].

use crate::cache::{CacheKey, QueryCache};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use waterbox_ee::{expr, EeError, Expression, GeoService, ValueNode};
use waterbox_geo::{m2_to_km2, BoundingBox, DateRange, GeoError};
use waterbox_metrics::{metric_defs, metrics};

/// Results larger than the box area by more than this factor are reported.
const AREA_TOLERANCE: f64 = 1.01;

/// Errors from area queries.
#[derive(Debug, Error)]
pub enum AreaError {
    #[error("No classified image found for {range} within {bbox}")]
    NoImageFound { range: DateRange, bbox: BoundingBox },

    #[error("Invalid input: {0}")]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Service(#[from] EeError),
}

/// What the service returned for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryOutcome {
    /// Total water area in m².
    Found(f64),
    /// No image matched, or it had no valid pixels in the box.
    NotFound,
}

/// Server-side parameters of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    /// Image collection asset id.
    pub collection: String,
    /// Band holding the water classification.
    pub band: String,
    /// Reduction scale in meters per pixel.
    pub scale_m: f64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            collection: expr::DYNAMIC_WORLD_COLLECTION.to_string(),
            band: "water".to_string(),
            scale_m: 10.0,
        }
    }
}

/// Handle to the server-side water band of the first matching image.
///
/// Never evaluated locally; only passed on to further server calls.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterMask {
    /// Single-band image expression.
    pub image: ValueNode,
    /// Name of its band.
    pub band: String,
}

/// A computed water area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterArea {
    /// Date range queried.
    pub range: DateRange,
    /// Box queried.
    pub bbox: BoundingBox,
    /// Raw sum in m².
    pub square_meters: f64,
    /// Converted area in km².
    pub square_kilometers: f64,
    /// Served from the cache without a round trip.
    pub cached: bool,
}

/// Filtered collection for a range and box.
fn filtered_collection(settings: &QuerySettings, range: &DateRange, bbox: &BoundingBox) -> ValueNode {
    let filter = expr::filter_and(vec![
        expr::filter_bounds(expr::rectangle(bbox)),
        expr::filter_date(range),
    ]);
    expr::filter_collection(expr::image_collection(&settings.collection), filter)
}

/// Expression counting the images that match a query.
pub fn match_count_expression(settings: &QuerySettings, range: &DateRange, bbox: &BoundingBox) -> Expression {
    Expression::new(expr::collection_size(filtered_collection(settings, range, bbox)))
}

/// Water band of the first image matching a query.
pub fn water_mask(settings: &QuerySettings, range: &DateRange, bbox: &BoundingBox) -> WaterMask {
    let first = expr::collection_first(filtered_collection(settings, range, bbox));
    WaterMask {
        image: expr::select_bands(first, &[settings.band.as_str()]),
        band: settings.band.clone(),
    }
}

/// Expression summing water area (m²) of `mask` over `bbox`.
pub fn water_area_expression(mask: &WaterMask, bbox: &BoundingBox, scale_m: f64) -> Expression {
    let area = expr::multiply(mask.image.clone(), expr::pixel_area());
    Expression::new(expr::reduce_region_sum(area, expr::rectangle(bbox), scale_m))
}

/// Read the match count from a `Collection.size` result.
fn parse_match_count(value: &Value) -> Result<u64, EeError> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .ok_or_else(|| EeError::UnexpectedResponse(format!("expected an image count, got {}", value)))
}

/// Read the band sum from a `reduceRegion` dictionary.
fn parse_band_sum(value: &Value, band: &str) -> Result<QueryOutcome, EeError> {
    let sum = match value {
        Value::Null => return Ok(QueryOutcome::NotFound),
        Value::Object(dict) => dict.get(band),
        other => {
            return Err(EeError::UnexpectedResponse(format!(
                "expected a dictionary from reduceRegion, got {}",
                other
            )))
        }
    };

    match sum {
        None | Some(Value::Null) => Ok(QueryOutcome::NotFound),
        Some(v) => v.as_f64().map(QueryOutcome::Found).ok_or_else(|| {
            EeError::UnexpectedResponse(format!("expected a number for '{}', got {}", band, v))
        }),
    }
}

/// Computes water areas against a [`GeoService`].
///
/// The service (and its session) is owned by the client and used for every
/// call; nothing is global.
#[derive(Debug)]
pub struct AreaQueryClient<S> {
    service: S,
    settings: QuerySettings,
    cache: Option<QueryCache>,
}

impl<S: GeoService> AreaQueryClient<S> {
    /// Client without a cache.
    pub fn new(service: S, settings: QuerySettings) -> Self {
        Self {
            service,
            settings,
            cache: None,
        }
    }

    /// Reuse results for repeated identical queries.
    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The backing service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Query settings.
    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// The cache, if enabled.
    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    /// Water band handle for a range and box.
    pub fn water_mask(&self, range: &DateRange, bbox: &BoundingBox) -> WaterMask {
        water_mask(&self.settings, range, bbox)
    }

    /// Ask the service for the water area in m², bypassing the cache.
    pub fn query_water_m2(&self, range: &DateRange, bbox: &BoundingBox) -> Result<QueryOutcome, AreaError> {
        let count_value = self
            .service
            .compute_value(&match_count_expression(&self.settings, range, bbox))?;
        let count = parse_match_count(&count_value)?;
        debug!("{} image(s) match {} within {}", count, range, bbox);
        if count == 0 {
            return Ok(QueryOutcome::NotFound);
        }

        let mask = self.water_mask(range, bbox);
        let sum = self
            .service
            .compute_value(&water_area_expression(&mask, bbox, self.settings.scale_m))?;
        let outcome = parse_band_sum(&sum, &self.settings.band)?;

        if let QueryOutcome::Found(m2) = outcome {
            let box_m2 = bbox.spherical_area_m2();
            if m2 < 0.0 || m2 > box_m2 * AREA_TOLERANCE {
                warn!(
                    "Implausible water area {:.0} m² for a box of {:.0} m²",
                    m2, box_m2
                );
            }
        }
        Ok(outcome)
    }

    /// Total water area for a range and box.
    ///
    /// Returns [`AreaError::NoImageFound`] instead of zero when nothing matches.
    pub fn water_area(&self, range: &DateRange, bbox: &BoundingBox) -> Result<WaterArea, AreaError> {
        metrics::counter!(metric_defs::QUERY_REQUESTS.name).increment(1);
        let key = CacheKey::new(range, bbox);

        if let Some(m2) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            metrics::counter!(metric_defs::QUERY_CACHE_HITS.name).increment(1);
            debug!("Cache hit for {} within {}", range, bbox);
            return Ok(Self::area(*range, *bbox, m2, true));
        }

        match self.query_water_m2(range, bbox)? {
            QueryOutcome::Found(m2) => {
                if let Some(cache) = &self.cache {
                    cache.insert(key, m2);
                    metrics::gauge!(metric_defs::QUERY_CACHE_SIZE.name).set(cache.len() as f64);
                }
                let area = Self::area(*range, *bbox, m2, false);
                info!(
                    "Water area for {} within {}: {:.2} km²",
                    range, bbox, area.square_kilometers
                );
                Ok(area)
            }
            QueryOutcome::NotFound => {
                metrics::counter!(metric_defs::QUERY_NOT_FOUND.name).increment(1);
                Err(AreaError::NoImageFound {
                    range: *range,
                    bbox: *bbox,
                })
            }
        }
    }

    fn area(range: DateRange, bbox: BoundingBox, square_meters: f64, cached: bool) -> WaterArea {
        WaterArea {
            range,
            bbox,
            square_meters,
            square_kilometers: m2_to_km2(square_meters),
            cached,
        }
    }
}
