//! Service-account credential loading.
//!
//! The credential file is checked before any network call: it must exist,
//! parse as a JSON object and carry `client_email`, `private_key` and
//! `project_id`.

use std::path::{Path, PathBuf};

use preflight_model::OpaqueError;
use serde_json::{Map, Value};
use thiserror::Error;

/// Fields every service-account key must provide.
pub const REQUIRED_FIELDS: [&str; 3] = ["client_email", "private_key", "project_id"];

/// Token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Parsed service-account key.
///
/// `Debug` is implemented by hand so the private key never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Errors raised while materializing credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials file not found at: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read credentials file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse credentials file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid credentials file: expected a JSON object")]
    NotAnObject,

    #[error("invalid credentials file, missing fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },
}

impl CredentialError {
    /// Short identifier used when the error is reported.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ENOENT",
            Self::Io { .. } => "EIO",
            Self::Parse(_) | Self::NotAnObject => "EPARSE",
            Self::MissingFields { .. } => "EMISSINGFIELDS",
        }
    }

    /// Individual problems to list in the report.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        match self {
            Self::MissingFields { fields } => fields.iter().map(|f| (*f).to_string()).collect(),
            other => vec![other.to_string()],
        }
    }

    #[must_use]
    pub fn to_opaque(&self) -> OpaqueError {
        OpaqueError::new(self.identifier(), self.to_string())
    }
}

/// Checks that the credential file exists.
pub fn locate(path: &Path) -> Result<PathBuf, CredentialError> {
    let resolved = std::path::absolute(path).unwrap_or_else(|err| {
        tracing::debug!(
            path = %path.display(),
            error = %err,
            "could not make credentials path absolute, using it as given"
        );
        path.to_path_buf()
    });
    if resolved.is_file() {
        Ok(resolved)
    } else {
        Err(CredentialError::NotFound { path: resolved })
    }
}

/// Reads and validates a service-account key file.
pub fn load(path: &Path) -> Result<ServiceAccountKey, CredentialError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents)
}

/// Parses service-account JSON, reporting every missing field at once.
pub fn parse(contents: &str) -> Result<ServiceAccountKey, CredentialError> {
    let value: Value = serde_json::from_str(contents)?;
    let Value::Object(object) = value else {
        return Err(CredentialError::NotAnObject);
    };

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| non_empty_str(&object, field).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(CredentialError::MissingFields { fields: missing });
    }

    let field = |name: &str| non_empty_str(&object, name).unwrap_or_default().to_string();
    Ok(ServiceAccountKey {
        client_email: field("client_email"),
        private_key: field("private_key"),
        project_id: field("project_id"),
        token_uri: non_empty_str(&object, "token_uri")
            .unwrap_or(DEFAULT_TOKEN_URI)
            .to_string(),
    })
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}
