//! Service-account OAuth 2.0 token exchange (JWT bearer grant).

use base64::{Engine as _, engine::general_purpose};
use preflight_core::ServiceAccountKey;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RemoteError;

/// Lifetime requested for the assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// `grant_type` value, already form-encoded.
const JWT_BEARER_GRANT: &str = "urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";

#[derive(Debug, Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

/// Claims of the signed assertion.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
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

/// Decodes the DER body of a PEM block.
pub fn decode_pem(pem: &str) -> Result<Vec<u8>, RemoteError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .flat_map(str::split_whitespace)
        .collect();
    if body.is_empty() {
        return Err(RemoteError::InvalidKey("empty PEM block".to_string()));
    }
    general_purpose::STANDARD
        .decode(body)
        .map_err(|err| RemoteError::InvalidKey(err.to_string()))
}

/// Builds and signs the RS256 assertion for `scope`, issued at `now`.
pub fn build_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    now: i64,
) -> Result<String, RemoteError> {
    let der = decode_pem(&key.private_key)?;
    let key_pair =
        RsaKeyPair::from_pkcs8(&der).map_err(|err| RemoteError::InvalidKey(err.to_string()))?;

    let header = Header {
        alg: "RS256",
        typ: "JWT",
    };
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    let signing_input = format!(
        "{}.{}",
        encode_segment(&serde_json::to_vec(&header)?),
        encode_segment(&serde_json::to_vec(&claims)?)
    );

    let mut signature = vec![0; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &RSA_PKCS1_SHA256,
            &SystemRandom::new(),
            signing_input.as_bytes(),
            &mut signature,
        )
        .map_err(|_| RemoteError::Signing)?;

    Ok(format!("{signing_input}.{}", encode_segment(&signature)))
}

fn encode_segment(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Exchanges a signed assertion for an access token.
pub fn fetch_token(
    http: &Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<String, RemoteError> {
    let assertion = build_assertion(key, scope, chrono::Utc::now().timestamp())?;
    // Base64url segments joined by dots need no further form encoding.
    let body = format!("grant_type={JWT_BEARER_GRANT}&assertion={assertion}");

    debug!(token_uri = %key.token_uri, "requesting access token");
    let response = http
        .post(&key.token_uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(ACCEPT, "application/json")
        .body(body)
        .send()?;

    let status = response.status();
    let text = response.text()?;
    if !status.is_success() {
        return Err(token_error(status.as_u16(), text));
    }

    let token: TokenResponse = serde_json::from_str(&text)?;
    debug!(expires_in = ?token.expires_in, "access token granted");
    Ok(token.access_token)
}

/// Interprets a failed token response.
pub fn token_error(status: u16, body: String) -> RemoteError {
    match serde_json::from_str::<TokenErrorResponse>(&body) {
        Ok(parsed) => RemoteError::Token {
            description: parsed.error_description.unwrap_or_else(|| parsed.error.clone()),
            error: parsed.error,
            body,
        },
        Err(_) => RemoteError::Token {
            error: status.to_string(),
            description: format!("token endpoint returned HTTP {status}"),
            body,
        },
    }
}
