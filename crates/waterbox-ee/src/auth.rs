//! Service-account authentication (OAuth 2.0 JWT bearer flow).
//!
//! A [`Session`] signs a short-lived RS256 assertion with the account's private
//! key, exchanges it at the token endpoint for an access token, and keeps that
//! token until shortly before it expires.

use crate::secrets::ServiceAccountKey;
use crate::{EeError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;
use waterbox_metrics::{metric_defs, metrics};

/// OAuth scopes requested for Earth Engine access.
pub const EARTH_ENGINE_SCOPES: &str =
    "https://www.googleapis.com/auth/earthengine https://www.googleapis.com/auth/cloud-platform";

/// Lifetime requested for each signed assertion (the maximum Google accepts).
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer: the service account e-mail.
    pub iss: String,
    /// Space-separated OAuth scopes.
    pub scope: String,
    /// Audience: the token endpoint.
    pub aud: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

impl Claims {
    /// Claims for `key` issued at `issued_at` (Unix seconds).
    pub fn new(key: &ServiceAccountKey, issued_at: u64) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: EARTH_ENGINE_SCOPES.to_string(),
            aud: key.token_uri().to_string(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }
}

/// An authenticated Earth Engine session.
///
/// Created once per process and passed to every client that talks to the
/// service. Token refresh happens behind `&self`.
pub struct Session {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::blocking::Client,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.key.token_uri())
            .finish()
    }
}

impl Session {
    /// Create a session without contacting the token endpoint yet.
    ///
    /// The private key is parsed here, so a key that cannot sign fails now.
    pub fn new(key: ServiceAccountKey, http: reqwest::blocking::Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| EeError::MalformedKey(format!("private_key: {}", e)))?;

        Ok(Self {
            key,
            encoding_key,
            http,
            token: Mutex::new(None),
        })
    }

    /// Create a session and obtain the first access token.
    pub fn establish(key: ServiceAccountKey, http: reqwest::blocking::Client) -> Result<Self> {
        let session = Self::new(key, http)?;
        session.access_token()?;
        debug!("Obtained first access token for {}", session.client_email());
        Ok(session)
    }

    /// The service account e-mail.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// The project named in the key, if any.
    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }

    /// A valid access token, exchanging a new assertion when needed.
    pub fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock();
        if let Some(current) = token.as_ref() {
            if current.is_fresh(Instant::now()) {
                return Ok(current.value.clone());
            }
            debug!("Access token for {} is about to expire, refreshing", self.client_email());
        }

        let fresh = self.exchange()?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    /// Sign an assertion issued at `issued_at` (Unix seconds).
    pub fn signed_assertion(&self, issued_at: u64) -> Result<String> {
        let claims = Claims::new(&self.key, issued_at);
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn exchange(&self) -> Result<AccessToken> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let assertion = self.signed_assertion(now)?;

        metrics::counter!(metric_defs::EE_REQUESTS.name, "operation" => "token").increment(1);
        let requested_at = Instant::now();
        let response = self
            .http
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            metrics::counter!(metric_defs::EE_FAILURES.name, "operation" => "token").increment(1);
        }
        let (value, lifetime) = parse_token_response(status.as_u16(), &body)?;

        Ok(AccessToken {
            value,
            expires_at: requested_at + lifetime,
        })
    }
}

/// Extract the access token and its lifetime from a token endpoint reply.
fn parse_token_response(status: u16, body: &str) -> Result<(String, Duration)> {
    if !(200..300).contains(&status) {
        let reason = match serde_json::from_str::<TokenErrorResponse>(body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{} ({})", err.error, desc),
                None => err.error,
            },
            Err(_) => format!("HTTP {}", status),
        };
        return Err(EeError::Auth(reason));
    }

    let token: TokenResponse = serde_json::from_str(body)
        .map_err(|e| EeError::Auth(format!("unreadable token response: {}", e)))?;
    let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
    Ok((token.access_token, lifetime))
}
