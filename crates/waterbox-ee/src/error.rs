//! Error types for the Earth Engine client.

use thiserror::Error;

/// Errors that can occur when talking to Earth Engine.
#[derive(Debug, Error)]
pub enum EeError {
    /// I/O error reading a key file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The secret store has no service-account key.
    #[error("Service account key not found in {source_name}")]
    MissingSecret {
        /// Where the key was looked up (env var name or file path).
        source_name: String,
    },

    /// The key document exists but cannot be used.
    #[error("Malformed service account key: {0}")]
    MalformedKey(String),

    /// Signing the JWT assertion failed (usually a bad private key).
    #[error("Failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint rejected the assertion.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP transport error.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Earth Engine API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service, or the raw body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response from Earth Engine: {0}")]
    UnexpectedResponse(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
