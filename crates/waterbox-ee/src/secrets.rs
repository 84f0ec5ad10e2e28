//! Service-account key loading from secret stores.
//!
//! A key is the JSON document Google issues for a service account. Only
//! `client_email` and `private_key` are required; `project_id` and `token_uri`
//! are used when present.

use crate::{EeError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding the key JSON.
pub const DEFAULT_KEY_ENV_VAR: &str = "GEE_SERVICE_ACCOUNT_KEY";

/// Google OAuth 2.0 token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A Google service-account key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account e-mail, used as the JWT issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Cloud project the account belongs to.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Token endpoint for the JWT bearer exchange.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse and validate a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| EeError::MalformedKey(format!("invalid key JSON: {}", e)))?;

        // Keys pasted into env vars often carry literal "\n" sequences.
        if !key.private_key.contains('\n') && key.private_key.contains("\\n") {
            key.private_key = key.private_key.replace("\\n", "\n");
        }

        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> Result<()> {
        if self.client_email.trim().is_empty() || !self.client_email.contains('@') {
            return Err(EeError::MalformedKey(format!(
                "client_email '{}' is not an e-mail address",
                self.client_email
            )));
        }
        if !self.private_key.contains("PRIVATE KEY") {
            return Err(EeError::MalformedKey(
                "private_key is not a PEM private key".to_string(),
            ));
        }
        Ok(())
    }

    /// Token endpoint for this key.
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// A place a service-account key can be read from.
pub trait SecretStore {
    /// Human-readable name of the store, for error messages.
    fn name(&self) -> String;

    /// Load the key.
    ///
    /// Returns [`EeError::MissingSecret`] when the store holds no key, and
    /// [`EeError::MalformedKey`] when it holds one that cannot be used.
    fn load_key(&self) -> Result<ServiceAccountKey>;
}

/// Reads the key JSON from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    /// Store backed by `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_ENV_VAR)
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> String {
        format!("environment variable {}", self.var)
    }

    fn load_key(&self) -> Result<ServiceAccountKey> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => {
                debug!("Loading service account key from ${}", self.var);
                ServiceAccountKey::from_json(&value)
            }
            _ => Err(EeError::MissingSecret {
                source_name: self.name(),
            }),
        }
    }
}

/// Reads the key JSON from a file.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store backed by the key file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SecretStore for FileSecretStore {
    fn name(&self) -> String {
        format!("key file {}", self.path.display())
    }

    fn load_key(&self) -> Result<ServiceAccountKey> {
        if !self.path.exists() {
            return Err(EeError::MissingSecret {
                source_name: self.name(),
            });
        }
        debug!("Loading service account key from {}", self.path.display());
        let json = std::fs::read_to_string(&self.path)?;
        ServiceAccountKey::from_json(&json)
    }
}
