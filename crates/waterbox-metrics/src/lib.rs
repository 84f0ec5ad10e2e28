//! Metrics infrastructure for waterbox.
//!
//! This crate re-exports the `metrics` crate and declares every metric the tool
//! records as a structured [`Metric`] constant, so names are never typed twice.
//! Without an installed recorder all recording calls are no-ops.
//!
//! # Example
//!
//! ```rust
//! use waterbox_metrics::{metric_defs, Metric, MetricKind};
//!
//! assert_eq!(metric_defs::EE_REQUESTS.name, "waterbox.ee.requests");
//! assert_eq!(metric_defs::EE_REQUESTS.kind, MetricKind::Counter);
//!
//! metrics::counter!(metric_defs::QUERY_REQUESTS.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use waterbox_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const LOOKUPS: Metric = Metric::counter("waterbox.example.lookups")
///     .with_description("Example lookups")
///     .with_unit(Unit::Count)
///     .with_labels(&["operation"]);
///
/// assert_eq!(LOOKUPS.name, "waterbox.example.lookups");
/// assert_eq!(LOOKUPS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "waterbox.ee.requests").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for waterbox.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Earth Engine client
    // ========================================================================

    /// Requests sent to the Earth Engine REST API.
    ///
    /// Labels: operation (compute, thumbnail, token)
    pub const EE_REQUESTS: Metric = Metric::counter("waterbox.ee.requests")
        .with_description("Requests sent to the Earth Engine REST API")
        .with_unit(Unit::Count)
        .with_labels(&["operation"]);

    /// Requests that failed at the transport or API level.
    ///
    /// Labels: operation
    pub const EE_FAILURES: Metric = Metric::counter("waterbox.ee.failures")
        .with_description("Earth Engine requests that returned an error")
        .with_unit(Unit::Count)
        .with_labels(&["operation"]);

    /// Round-trip time of Earth Engine requests.
    ///
    /// Labels: operation
    pub const EE_REQUEST_TIME: Metric = Metric::histogram("waterbox.ee.request_time_ms")
        .with_description("Round-trip time of Earth Engine requests in milliseconds")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["operation"]);

    // ========================================================================
    // Area queries
    // ========================================================================

    /// Area queries received (cached or not).
    pub const QUERY_REQUESTS: Metric = Metric::counter("waterbox.query.requests")
        .with_description("Water area queries received")
        .with_unit(Unit::Count);

    /// Area queries answered from the cache.
    pub const QUERY_CACHE_HITS: Metric = Metric::counter("waterbox.query.cache_hits")
        .with_description("Water area queries answered from the cache")
        .with_unit(Unit::Count);

    /// Area queries for which no image matched.
    pub const QUERY_NOT_FOUND: Metric = Metric::counter("waterbox.query.not_found")
        .with_description("Water area queries with no matching image")
        .with_unit(Unit::Count);

    /// Entries currently held by the query cache.
    pub const QUERY_CACHE_SIZE: Metric = Metric::gauge("waterbox.query.cache_size")
        .with_description("Entries held by the query cache")
        .with_unit(Unit::Count);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &EE_REQUESTS,
        &EE_FAILURES,
        &EE_REQUEST_TIME,
        &QUERY_REQUESTS,
        &QUERY_CACHE_HITS,
        &QUERY_NOT_FOUND,
        &QUERY_CACHE_SIZE,
    ];
}

/// Registers descriptions for every metric in [`metric_defs::ALL`].
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Installs a Prometheus exporter listening on the default address.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_exporter(
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new().install()?;
    describe_metrics();
    Ok(())
}
