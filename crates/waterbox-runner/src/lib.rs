//! # waterbox-runner
//!
//! Water surface area inside a bounding box, computed from the Dynamic World
//! land-cover classification on Google Earth Engine.
//!
//! - [`AreaQueryClient`] runs the filter and reduction on the server and
//!   caches results in a bounded [`QueryCache`]
//! - [`render_overlay`] turns the water mask into a Leaflet map page
//! - [`present`] holds the default inputs, the result line and the
//!   interactive loop used by the `waterbox` binary
//!
//! ## Example
//!
//! ```no_run
//! use waterbox_ee::{ClientConfig, EarthEngineClient, EnvSecretStore, SecretStore};
//! use waterbox_runner::{format_area_line, AreaQueryClient, QueryInputs, QuerySettings};
//!
//! let key = EnvSecretStore::default().load_key()?;
//! let service = EarthEngineClient::connect(key, &ClientConfig::default())?;
//! let client = AreaQueryClient::new(service, QuerySettings::default());
//!
//! let (range, bbox) = QueryInputs::default().validate()?;
//! let area = client.water_area(&range, &bbox)?;
//! println!("{}", format_area_line(area.square_kilometers));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod overlay;
pub mod present;
pub mod query;

pub use cache::{CacheKey, CacheStats, QueryCache, COORD_QUANTUM_DEG};
pub use config::{AppConfig, ConfigError, MapConfig};
pub use overlay::{overlay_expression, render_overlay, MapOverlay, OverlayStyle};
pub use present::{
    error_report, format_area_line, run_interactive, InputError, QueryInputs, SessionSummary,
};
pub use query::{
    AreaError, AreaQueryClient, QueryOutcome, QuerySettings, WaterArea, WaterMask,
};
