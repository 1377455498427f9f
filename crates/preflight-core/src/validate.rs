//! Configuration validation: presence and shape of required keys.
//!
//! Validation is exhaustive within its stage: every missing key is
//! collected so the report can show all problems at once.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use preflight_model::target::{DB_HOST, DB_PORT, DB_SSL};
use preflight_model::{Fact, KeyShape, Target, TargetConfig, ValidationResult};

/// Standard PostgreSQL port.
pub const STANDARD_POSTGRES_PORT: u16 = 5432;

/// Host suffix of NeonDB endpoints.
const NEON_HOST_SUFFIX: &str = ".neon.tech";

/// Read-only source of configuration values.
pub trait ConfigSource {
    /// Raw value for `key`, `None` when absent.
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl ConfigSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|value| (*value).to_string())
    }
}

/// Checks every required key of `target` against `source`.
pub fn validate(target: Target, source: &dyn ConfigSource) -> ValidationResult {
    let mut config = TargetConfig::empty(target);
    for key in target.required_keys() {
        config.set(key.name, source.get(key.name).as_deref());
    }

    let missing: BTreeSet<&'static str> = config.missing_keys();
    let mut malformed = BTreeMap::new();
    for (key, value) in config.entries() {
        let Some(value) = value else {
            continue;
        };
        if let Some(reason) = shape_error(key.shape, value) {
            malformed.insert(key.name, reason);
        }
    }

    if missing.is_empty() && malformed.is_empty() {
        tracing::debug!(service = %target, "configuration valid");
        ValidationResult::Valid(config)
    } else {
        tracing::debug!(
            service = %target,
            missing = missing.len(),
            malformed = malformed.len(),
            "configuration invalid"
        );
        ValidationResult::Invalid {
            config,
            missing,
            malformed,
        }
    }
}

fn shape_error(shape: KeyShape, value: &str) -> Option<String> {
    match shape {
        KeyShape::Port => match value.parse::<u16>() {
            Ok(0) => Some("port must be between 1 and 65535".to_string()),
            Ok(_) => None,
            Err(_) => Some(format!("not a valid number: {value}")),
        },
        KeyShape::Text | KeyShape::Flag | KeyShape::Path => None,
    }
}

/// Whether an SSL flag value enables TLS.
#[must_use]
pub fn ssl_enabled(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Non-fatal observations about an otherwise usable configuration.
#[must_use]
pub fn advisories(config: &TargetConfig) -> Vec<Fact> {
    let mut facts = Vec::new();
    if config.target() != Target::Database {
        return facts;
    }

    if let Some(port) = config.get(DB_PORT).and_then(|p| p.parse::<u16>().ok()) {
        if port != STANDARD_POSTGRES_PORT {
            facts.push(Fact::advisory(
                DB_PORT,
                format!(
                    "{port} (expected {STANDARD_POSTGRES_PORT} for standard PostgreSQL; \
                     non-standard deployments may use another port)"
                ),
            ));
        }
    }

    if let Some(host) = config.get(DB_HOST) {
        if !host.contains(NEON_HOST_SUFFIX) {
            facts.push(Fact::advisory(
                DB_HOST,
                "doesn't appear to be a NeonDB host (expected ep-xxxxx-xxxxx.region.aws.neon.tech)",
            ));
        }
    }

    if config.get(DB_SSL).is_some() && !ssl_enabled(config.get(DB_SSL)) {
        facts.push(Fact::advisory(
            DB_SSL,
            "not set to 'true' (NeonDB requires SSL)",
        ));
    }

    facts
}
