//! Facts and raw failures produced by service probes.

use serde::Serialize;
use thiserror::Error;

/// Severity of a reported fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactLevel {
    #[default]
    Info,
    /// Non-fatal warning; never turns a run into a failure.
    Advisory,
}

/// A single `(label, value)` observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub label: String,
    pub value: String,
    pub level: FactLevel,
}

impl Fact {
    pub fn info(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            level: FactLevel::Info,
        }
    }

    pub fn advisory(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            level: FactLevel::Advisory,
        }
    }

    #[must_use]
    pub fn is_advisory(&self) -> bool {
        self.level == FactLevel::Advisory
    }
}

/// Raw failure from a remote call or a local check.
///
/// `identifier` is a short machine code (`ENOTFOUND`, a SQLSTATE, an HTTP
/// status name); `message` is whatever the underlying client reported.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{identifier}: {message}")]
pub struct OpaqueError {
    pub identifier: String,
    pub message: String,
    /// Raw payload kept for debugging, e.g. an API error body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OpaqueError {
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Optional sub-check that failed without aborting the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Omission {
    /// Label of the skipped sub-check.
    pub check: String,
    pub error: OpaqueError,
}

/// Result of running a probe's sub-checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Every required sub-check passed. `facts` keep sub-check order.
    Success {
        facts: Vec<Fact>,
        omitted: Vec<Omission>,
    },
    /// First required sub-check that failed; later ones were not attempted.
    Failure { error: OpaqueError },
}

impl ProbeOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Facts of a successful outcome, empty on failure.
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        match self {
            Self::Success { facts, .. } => facts,
            Self::Failure { .. } => &[],
        }
    }
}
