//! Earth Engine REST client.
//!
//! Two endpoints are used:
//! - `POST {base}/v1/projects/{project}/value:compute` evaluates an expression
//!   and returns its value as JSON
//! - `POST {base}/v1/projects/{project}/thumbnails` registers a rendering of an
//!   image expression; the pixels are then served from
//!   `{base}/v1/{name}:getPixels`
//!
//! All calls are blocking and authenticated with the [`Session`]'s bearer token.

use crate::auth::Session;
use crate::expr::Expression;
use crate::secrets::ServiceAccountKey;
use crate::{EeError, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use waterbox_metrics::{metric_defs, metrics};

/// Public Earth Engine REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://earthengine.googleapis.com";

/// Project used when neither the configuration nor the key names one.
pub const LEGACY_PROJECT: &str = "earthengine-legacy";

/// Default timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Operations a geospatial backend must provide.
///
/// [`EarthEngineClient`] talks to the real service; tests substitute an
/// in-memory implementation.
pub trait GeoService {
    /// Evaluate `expression` and return its value.
    ///
    /// A null server value is returned as [`Value::Null`].
    fn compute_value(&self, expression: &Expression) -> Result<Value>;

    /// Register a thumbnail of an RGB image expression and return its URL.
    fn thumbnail_url(&self, expression: &Expression) -> Result<String>;
}

impl<T: GeoService + ?Sized> GeoService for &T {
    fn compute_value(&self, expression: &Expression) -> Result<Value> {
        (**self).compute_value(expression)
    }

    fn thumbnail_url(&self, expression: &Expression) -> Result<String> {
        (**self).thumbnail_url(expression)
    }
}

/// Connection settings for [`EarthEngineClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Cloud project to bill; falls back to the key's project, then [`LEGACY_PROJECT`].
    pub project: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            project: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Request statistics for the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestStats {
    /// API requests sent this session.
    pub requests: usize,
    /// Response bytes received this session.
    pub bytes_received: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Blocking Earth Engine client bound to one authenticated session.
pub struct EarthEngineClient {
    session: Session,
    http: reqwest::blocking::Client,
    base_url: String,
    project: String,
    requests: AtomicUsize,
    bytes_received: AtomicU64,
}

impl std::fmt::Debug for EarthEngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarthEngineClient")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("session", &self.session)
            .finish()
    }
}

impl EarthEngineClient {
    /// Authenticate with `key` and build a client.
    ///
    /// Fails if the token exchange fails; nothing is retried.
    pub fn connect(key: ServiceAccountKey, config: &ClientConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let session = Session::establish(key, http.clone())?;
        Ok(Self::with_session(session, http, config))
    }

    /// Build a client around an existing session.
    pub fn with_session(
        session: Session,
        http: reqwest::blocking::Client,
        config: &ClientConfig,
    ) -> Self {
        let project = config
            .project
            .clone()
            .or_else(|| session.project_id().map(str::to_string))
            .unwrap_or_else(|| LEGACY_PROJECT.to_string());

        Self {
            session,
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project,
            requests: AtomicUsize::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    /// The project requests are issued against.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The authenticated session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Request statistics for this session.
    pub fn request_stats(&self) -> RequestStats {
        RequestStats {
            requests: self.requests.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }

    fn compute_url(&self) -> String {
        format!("{}/v1/projects/{}/value:compute", self.base_url, self.project)
    }

    fn thumbnails_url(&self) -> String {
        format!("{}/v1/projects/{}/thumbnails", self.base_url, self.project)
    }

    fn post_json(&self, operation: &'static str, url: &str, body: &Value) -> Result<Value> {
        let token = self.session.access_token()?;

        debug!("POST {}", url);
        metrics::counter!(metric_defs::EE_REQUESTS.name, "operation" => operation).increment(1);
        self.requests.fetch_add(1, Ordering::Relaxed);

        let started = Instant::now();
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .inspect_err(|_| {
                metrics::counter!(metric_defs::EE_FAILURES.name, "operation" => operation)
                    .increment(1);
            })?;
        let status = response.status();
        let text = response.text()?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        metrics::histogram!(metric_defs::EE_REQUEST_TIME.name, "operation" => operation)
            .record(elapsed_ms);
        self.bytes_received
            .fetch_add(text.len() as u64, Ordering::Relaxed);
        debug!("{} -> HTTP {} in {:.0} ms", operation, status, elapsed_ms);

        if !status.is_success() {
            metrics::counter!(metric_defs::EE_FAILURES.name, "operation" => operation).increment(1);
            let err = api_error(status.as_u16(), &text);
            warn!("Earth Engine {} request failed: {}", operation, err);
            return Err(err);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl GeoService for EarthEngineClient {
    fn compute_value(&self, expression: &Expression) -> Result<Value> {
        let body = json!({ "expression": expression });
        let response = self.post_json("compute", &self.compute_url(), &body)?;
        parse_compute_response(response)
    }

    fn thumbnail_url(&self, expression: &Expression) -> Result<String> {
        let body = json!({ "expression": expression, "fileFormat": "PNG" });
        let response = self.post_json("thumbnail", &self.thumbnails_url(), &body)?;
        parse_thumbnail_response(&self.base_url, &response)
    }
}

/// Build an [`EeError::Api`] from an error reply.
fn api_error(status: u16, body: &str) -> EeError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(code) => format!("{}: {}", code, parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.trim().to_string(),
    };
    EeError::Api { status, message }
}

/// `value:compute` answers `{"result": ...}`; an absent result means null.
fn parse_compute_response(response: Value) -> Result<Value> {
    match response {
        Value::Object(mut map) => Ok(map.remove("result").unwrap_or(Value::Null)),
        other => Err(EeError::UnexpectedResponse(format!(
            "expected an object from value:compute, got {}",
            other
        ))),
    }
}

/// `thumbnails` answers `{"name": "projects/.../thumbnails/ID"}`.
fn parse_thumbnail_response(base_url: &str, response: &Value) -> Result<String> {
    let name = response
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            EeError::UnexpectedResponse(format!("thumbnail response has no name: {}", response))
        })?;
    Ok(format!("{}/v1/{}:getPixels", base_url, name))
}
