//! Staged connectivity diagnostics.
//!
//! A [`DiagnosticPipeline`] validates a target's configuration, loads its
//! credentials when needed, runs the target's [`ServiceProbe`] and returns a
//! [`DiagnosticReport`](preflight_model::DiagnosticReport). Probe failures are
//! mapped to a [`DiagnosticCategory`](preflight_model::DiagnosticCategory) by
//! [`classify`], and [`render`] turns the report into display lines.
//!
//! Remote services are reached through narrow traits
//! ([`DatabaseConnector`], [`SheetsAuthorizer`]) so every stage can be
//! exercised with fakes.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use preflight_core::{DiagnosticPipeline, SpreadsheetProbe, Style, render};
//! use preflight_model::{ProbeDepth, Target};
//!
//! fn diagnose(authorizer: Box<dyn preflight_core::SheetsAuthorizer>) -> i32 {
//!     let source: HashMap<String, String> = std::env::vars().collect();
//!     let pipeline = DiagnosticPipeline::new(
//!         Target::Spreadsheet,
//!         ProbeDepth::Full,
//!         SpreadsheetProbe::new(authorizer),
//!     );
//!     let report = pipeline.run(&source);
//!     for line in render(&report, &Style::plain()) {
//!         println!("{line}");
//!     }
//!     report.exit_code()
//! }
//! ```

pub mod classify;
pub mod credentials;
pub mod mask;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod style;
pub mod validate;

pub use classify::classify;
pub use credentials::{CredentialError, ServiceAccountKey};
pub use mask::{PASSWORD_DISPLAY_CAP, mask};
pub use pipeline::{DiagnosticPipeline, PipelineState};
pub use probe::{
    CheckKind, ConnectParams, DEFAULT_TIMEOUT, DatabaseConnector, DatabaseProbe, DatabaseSession,
    MAX_TIMEOUT, MIN_TIMEOUT, READONLY_SCOPE, ServiceProbe, SheetsAuthorizer, SheetsClient,
    SpreadsheetMeta, SpreadsheetProbe, StageFailure, SubCheck, TabMeta, clamp_timeout, run_checks,
};
pub use report::{render, render_env_check};
pub use style::Style;
pub use validate::{ConfigSource, advisories, validate};
