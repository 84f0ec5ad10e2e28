//! In-memory stand-in for the Earth Engine service.

#![allow(dead_code)]

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};
use waterbox_ee::{EeError, Expression, GeoService};
use waterbox_geo::{BoundingBox, DateRange};

/// Answers by the root function of each expression and records every call.
pub struct MockService {
    match_count: u64,
    water: Value,
    thumbnail: Result<String, String>,
    calls: Mutex<Vec<Expression>>,
}

impl MockService {
    /// One matching image whose water sum is `square_meters`.
    pub fn with_area(square_meters: f64) -> Self {
        Self {
            match_count: 1,
            water: json!(square_meters),
            thumbnail: Ok("https://earthengine.test/v1/projects/p/thumbnails/abc:getPixels".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// No image matches the filter.
    pub fn empty() -> Self {
        Self {
            match_count: 0,
            ..Self::with_area(0.0)
        }
    }

    /// An image matches but the reduction has no valid pixels.
    pub fn with_null_sum() -> Self {
        Self {
            water: Value::Null,
            ..Self::with_area(0.0)
        }
    }

    /// Thumbnail requests fail with `message`.
    pub fn failing_thumbnails(mut self, message: &str) -> Self {
        self.thumbnail = Err(message.to_string());
        self
    }

    /// Every expression sent, in order.
    pub fn calls(&self) -> Vec<Expression> {
        self.calls.lock().clone()
    }

    /// Number of expressions sent.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, expression: &Expression) -> Option<String> {
        self.calls.lock().push(expression.clone());
        expression.root().function_name().map(str::to_string)
    }
}

impl GeoService for MockService {
    fn compute_value(&self, expression: &Expression) -> Result<Value, EeError> {
        match self.record(expression).as_deref() {
            Some("Collection.size") => Ok(json!(self.match_count)),
            Some("Image.reduceRegion") => Ok(json!({ "water": self.water })),
            other => Err(EeError::UnexpectedResponse(format!(
                "mock cannot evaluate {:?}",
                other
            ))),
        }
    }

    fn thumbnail_url(&self, expression: &Expression) -> Result<String, EeError> {
        self.record(expression);
        self.thumbnail.clone().map_err(|message| EeError::Api {
            status: 500,
            message,
        })
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 4, day).unwrap()
}

pub fn range(start_day: u32, end_day: u32) -> DateRange {
    DateRange::new(date(start_day), date(end_day)).unwrap()
}

pub fn default_bbox() -> BoundingBox {
    BoundingBox::new(20.0, 52.0, 21.0, 53.0).unwrap()
}
