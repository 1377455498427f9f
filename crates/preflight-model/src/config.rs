//! Validated configuration for a target.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::target::{RequiredKey, Target};

/// Placeholder emitted instead of secret values when a config is serialized.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Ordered mapping from each required key of a target to its value.
///
/// A blank value is stored as `None`. Other values are trimmed on insertion,
/// except secrets, which are kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    target: Target,
    values: Vec<(&'static RequiredKey, Option<String>)>,
}

impl TargetConfig {
    /// Builds a config holding every required key of `target`, all missing.
    #[must_use]
    pub fn empty(target: Target) -> Self {
        Self {
            target,
            values: target.required_keys().iter().map(|key| (key, None)).collect(),
        }
    }

    /// Sets the value for `name`. Unknown keys are ignored.
    pub fn set(&mut self, name: &str, value: Option<&str>) {
        let Some((key, slot)) = self.values.iter_mut().find(|(key, _)| key.name == name) else {
            return;
        };
        *slot = value
            .filter(|v| !v.trim().is_empty())
            .map(|v| if key.secret { v } else { v.trim() })
            .map(str::to_string);
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, Some(value));
        self
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// Value of `name`, `None` when missing or not a key of this target.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key.name == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Entries in the target's fixed key order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static RequiredKey, Option<&str>)> + '_ {
        self.values
            .iter()
            .map(|(key, value)| (*key, value.as_deref()))
    }

    /// Names of keys without a value.
    #[must_use]
    pub fn missing_keys(&self) -> BTreeSet<&'static str> {
        self.values
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key.name)
            .collect()
    }
}

impl Serialize for TargetConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            key: &'a str,
            value: Option<&'a str>,
        }

        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for (key, value) in self.entries() {
            let value = if key.secret {
                value.map(|_| REDACTED_VALUE)
            } else {
                value
            };
            seq.serialize_element(&Entry {
                key: key.name,
                value,
            })?;
        }
        seq.end()
    }
}

/// Outcome of the validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Every required key is present and well formed.
    Valid(TargetConfig),
    /// At least one key is missing or malformed.
    Invalid {
        /// Config as far as it could be read; missing keys are `None`.
        config: TargetConfig,
        /// Every missing or empty key.
        missing: BTreeSet<&'static str>,
        /// Present keys whose value has the wrong shape, with the reason.
        malformed: BTreeMap<&'static str, String>,
    },
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The config, valid or not.
    #[must_use]
    pub fn config(&self) -> &TargetConfig {
        match self {
            Self::Valid(config) | Self::Invalid { config, .. } => config,
        }
    }

    /// Missing keys; empty when valid.
    #[must_use]
    pub fn missing(&self) -> BTreeSet<&'static str> {
        match self {
            Self::Valid(_) => BTreeSet::new(),
            Self::Invalid { missing, .. } => missing.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{DB_HOST, DB_PASSWORD, DB_PORT};

    #[test]
    fn empty_config_lists_every_key_as_missing() {
        let config = TargetConfig::empty(Target::Database);
        assert_eq!(config.missing_keys().len(), 6);
        assert_eq!(config.entries().count(), 6);
    }

    #[test]
    fn blank_values_are_missing() {
        let mut config = TargetConfig::empty(Target::Database);
        config.set(DB_HOST, Some("   "));
        config.set(DB_PORT, Some(" 5432 "));
        assert_eq!(config.get(DB_HOST), None);
        assert_eq!(config.get(DB_PORT), Some("5432"));
    }

    #[test]
    fn secret_values_keep_surrounding_whitespace() {
        let mut config = TargetConfig::empty(Target::Database);
        config.set(DB_PASSWORD, Some("  pa ss  "));
        assert_eq!(config.get(DB_PASSWORD), Some("  pa ss  "));
        config.set(DB_PASSWORD, Some(" \t "));
        assert_eq!(config.get(DB_PASSWORD), None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = TargetConfig::empty(Target::Spreadsheet).with(DB_HOST, "db.example");
        assert_eq!(config.get(DB_HOST), None);
    }

    #[test]
    fn serialization_redacts_secrets() {
        let config = TargetConfig::empty(Target::Database).with(DB_PASSWORD, "hunter2");
        let json = serde_json::to_string(&config).expect("serialize config");
        assert!(!json.contains("hunter2"));
        assert!(json.contains(REDACTED_VALUE));
    }
}
