//! Service probes and the sub-check runner they share.
//!
//! A probe describes its live checks as an ordered list of [`SubCheck`]s.
//! [`run_checks`] executes them: a `Required` failure ends the run with
//! that error, an `Optional` failure is recorded and the run continues.

pub mod database;
pub mod spreadsheet;

use std::time::Duration;

use preflight_model::{DiagnosticCategory, Fact, Omission, OpaqueError, ProbeOutcome, TargetConfig};

pub use database::{
    ConnectParams, DatabaseConnector, DatabaseProbe, DatabaseSession, extract_version,
};
pub use spreadsheet::{
    READONLY_SCOPE, SheetsAuthorizer, SheetsClient, SpreadsheetMeta, SpreadsheetProbe, TabMeta,
};

/// Timeout applied to each network sub-check unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shortest timeout a caller may configure.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest timeout a caller may configure.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(15);

/// Clamps a requested timeout into `MIN_TIMEOUT..=MAX_TIMEOUT`.
#[must_use]
pub fn clamp_timeout(requested: Duration) -> Duration {
    requested.clamp(MIN_TIMEOUT, MAX_TIMEOUT)
}

/// Whether a sub-check failure aborts the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Failure aborts the remaining sub-checks.
    Required,
    /// Failure is recorded and the probe continues.
    Optional,
}

/// One atomic live test run against a probe context `C`.
pub struct SubCheck<C> {
    pub label: &'static str,
    pub kind: CheckKind,
    pub run: fn(&mut C) -> Result<Vec<Fact>, OpaqueError>,
}

impl<C> SubCheck<C> {
    pub const fn required(
        label: &'static str,
        run: fn(&mut C) -> Result<Vec<Fact>, OpaqueError>,
    ) -> Self {
        Self {
            label,
            kind: CheckKind::Required,
            run,
        }
    }

    pub const fn optional(
        label: &'static str,
        run: fn(&mut C) -> Result<Vec<Fact>, OpaqueError>,
    ) -> Self {
        Self {
            label,
            kind: CheckKind::Optional,
            run,
        }
    }
}

/// Runs `checks` in order against `context`.
pub fn run_checks<C>(context: &mut C, checks: &[SubCheck<C>]) -> ProbeOutcome {
    let mut facts = Vec::new();
    let mut omitted = Vec::new();

    for check in checks {
        match (check.run)(context) {
            Ok(found) => {
                tracing::debug!(check = check.label, facts = found.len(), "sub-check passed");
                facts.extend(found);
            }
            Err(error) => match check.kind {
                CheckKind::Required => {
                    tracing::debug!(
                        check = check.label,
                        identifier = %error.identifier,
                        "required sub-check failed"
                    );
                    return ProbeOutcome::Failure { error };
                }
                CheckKind::Optional => {
                    tracing::warn!(
                        check = check.label,
                        identifier = %error.identifier,
                        "optional sub-check failed"
                    );
                    omitted.push(Omission {
                        check: check.label.to_string(),
                        error,
                    });
                }
            },
        }
    }

    ProbeOutcome::Success { facts, omitted }
}

/// Locally detected failure of the authentication stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub category: DiagnosticCategory,
    /// Individual problems, e.g. the missing credential fields.
    pub problems: Vec<String>,
    pub error: Option<OpaqueError>,
}

/// A diagnosable remote service.
pub trait ServiceProbe {
    /// Whether the target needs credential materialization before probing.
    fn requires_authentication(&self) -> bool;

    /// Materializes credentials without touching the network.
    fn authenticate(&mut self, config: &TargetConfig) -> Result<Vec<Fact>, StageFailure>;

    /// Runs the live sub-checks.
    fn probe(&mut self, config: &TargetConfig) -> ProbeOutcome;
}
