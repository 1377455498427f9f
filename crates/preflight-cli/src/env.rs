//! Process environment as a configuration source.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use preflight_core::{ConfigSource, DEFAULT_TIMEOUT, clamp_timeout};
use tracing::{debug, warn};

/// Overrides the per-call network timeout, in whole seconds.
pub const TIMEOUT_VAR: &str = "PREFLIGHT_TIMEOUT_SECS";

/// Reads configuration from `std::env`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Loads a `.env` file into the process environment.
///
/// Variables already set in the environment are kept. Without an explicit
/// path a missing `.env` is not an error.
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
            debug!(path = %path.display(), "loaded env file");
        }
        None => match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => debug!("no .env file found"),
            Err(err) => return Err(err).context("failed to load .env"),
        },
    }
    Ok(())
}

/// Network timeout from `PREFLIGHT_TIMEOUT_SECS`, clamped to the allowed range.
#[must_use]
pub fn timeout_from_env() -> Duration {
    timeout_from(std::env::var(TIMEOUT_VAR).ok().as_deref())
}

/// Parses a timeout override; unparsable values fall back to the default.
#[must_use]
pub fn timeout_from(value: Option<&str>) -> Duration {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return DEFAULT_TIMEOUT;
    };
    match raw.parse::<u64>() {
        Ok(secs) => {
            let timeout = clamp_timeout(Duration::from_secs(secs));
            if timeout.as_secs() != secs {
                warn!(requested = secs, applied = timeout.as_secs(), "timeout clamped");
            }
            timeout
        }
        Err(_) => {
            warn!(value = raw, "ignoring invalid {TIMEOUT_VAR}");
            DEFAULT_TIMEOUT
        }
    }
}
