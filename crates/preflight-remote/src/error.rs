//! Error types for the remote adapters.

use std::io;

use preflight_model::OpaqueError;
use thiserror::Error;

/// Errors raised while talking to PostgreSQL or the Google APIs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// PostgreSQL client error.
    #[error(transparent)]
    Postgres(#[from] postgres::Error),

    /// TLS connector could not be built.
    #[error("failed to set up TLS: {0}")]
    Tls(#[from] native_tls::Error),

    /// HTTP transport error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The service-account private key could not be used for signing.
    #[error("Unable to parse private key: {0}")]
    InvalidKey(String),

    /// Signing the token assertion failed.
    #[error("failed to sign token assertion")]
    Signing,

    /// The token endpoint rejected the assertion.
    #[error("{error}: {description}")]
    Token {
        error: String,
        description: String,
        body: String,
    },

    /// A Google API returned an error response.
    #[error("{message}")]
    Api {
        /// Google status name, e.g. `PERMISSION_DENIED`.
        status: String,
        message: String,
        /// Full JSON body as returned.
        body: String,
    },

    /// A response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RemoteError {
    /// Short identifier used for classification.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            Self::Postgres(err) => postgres_identifier(err),
            Self::Tls(_) => "ETLS".to_string(),
            Self::Http(err) => http_identifier(err),
            Self::InvalidKey(_) => "EKEYREJECTED".to_string(),
            Self::Signing => "ESIGN".to_string(),
            Self::Token { error, .. } => error.clone(),
            Self::Api { status, .. } => status.clone(),
            Self::Decode(_) => "EPROTO".to_string(),
        }
    }

    /// Message reported to the user; database errors use the server text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Postgres(err) => err
                .as_db_error()
                .map_or_else(|| err.to_string(), |db| db.message().to_string()),
            other => other.to_string(),
        }
    }
}

impl From<RemoteError> for OpaqueError {
    fn from(err: RemoteError) -> Self {
        let opaque = OpaqueError::new(err.identifier(), err.message());
        match err {
            RemoteError::Api { body, .. } | RemoteError::Token { body, .. } => {
                opaque.with_detail(pretty_json(&body))
            }
            _ => opaque,
        }
    }
}

fn pretty_json(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

fn postgres_identifier(err: &postgres::Error) -> String {
    if let Some(db) = err.as_db_error() {
        return db.code().code().to_string();
    }
    if err.is_closed() {
        return "ECONNRESET".to_string();
    }
    source_identifier(err).unwrap_or_else(|| "EPOSTGRES".to_string())
}

fn http_identifier(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "ETIMEDOUT".to_string();
    }
    if let Some(identifier) = source_identifier(err) {
        return identifier;
    }
    if let Some(status) = err.status() {
        return status.as_u16().to_string();
    }
    "ENETWORK".to_string()
}

/// Walks the source chain looking for a recognizable network failure.
fn source_identifier(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(error) = current {
        if let Some(io_err) = error.downcast_ref::<io::Error>() {
            if let Some(identifier) = io_identifier(io_err.kind(), &io_err.to_string()) {
                return Some(identifier.to_string());
            }
        }
        if let Some(identifier) = message_identifier(&error.to_string()) {
            return Some(identifier.to_string());
        }
        current = error.source();
    }
    None
}

/// Maps an I/O failure to a network error code.
#[must_use]
pub fn io_identifier(kind: io::ErrorKind, message: &str) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        io::ErrorKind::HostUnreachable => Some("EHOSTUNREACH"),
        io::ErrorKind::NetworkUnreachable => Some("ENETUNREACH"),
        _ => message_identifier(message),
    }
}

/// Recognizes resolver failures, which surface as plain messages.
fn message_identifier(message: &str) -> Option<&'static str> {
    let message = message.to_lowercase();
    let unresolved = [
        "failed to lookup address",
        "name or service not known",
        "nodename nor servname",
        "no such host",
        "dns error",
    ];
    if unresolved.iter().any(|phrase| message.contains(phrase)) {
        Some("ENOTFOUND")
    } else if message.contains("temporary failure in name resolution") {
        Some("EAI_AGAIN")
    } else {
        None
    }
}
