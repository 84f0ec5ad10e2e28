//! # waterbox-ee
//!
//! A small blocking client for the Google Earth Engine REST API.
//!
//! The crate covers exactly what the water-area tool needs:
//! - loading a service-account key from a [`SecretStore`]
//! - exchanging it for an access token ([`Session`])
//! - describing server-side computations as expression graphs ([`expr`])
//! - evaluating them and requesting thumbnails through [`GeoService`]
//!
//! ## Example
//!
//! ```no_run
//! use waterbox_ee::{expr, ClientConfig, EarthEngineClient, EnvSecretStore, Expression,
//!                   GeoService, SecretStore};
//!
//! let key = EnvSecretStore::default().load_key()?;
//! let client = EarthEngineClient::connect(key, &ClientConfig::default())?;
//!
//! let size = expr::collection_size(expr::image_collection(expr::DYNAMIC_WORLD_COLLECTION));
//! let images = client.compute_value(&Expression::new(size))?;
//! println!("Dynamic World holds {} images", images);
//! # Ok::<(), waterbox_ee::EeError>(())
//! ```

mod auth;
mod client;
mod error;
pub mod expr;
mod secrets;

pub use auth::{Claims, Session, EARTH_ENGINE_SCOPES};
pub use client::{
    ClientConfig, EarthEngineClient, GeoService, RequestStats, DEFAULT_API_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT, LEGACY_PROJECT,
};
pub use error::EeError;
pub use expr::{Expression, ValueNode};
pub use secrets::{
    EnvSecretStore, FileSecretStore, SecretStore, ServiceAccountKey, DEFAULT_KEY_ENV_VAR,
    DEFAULT_TOKEN_URI,
};

/// Result type for Earth Engine operations.
pub type Result<T> = std::result::Result<T, EeError>;
