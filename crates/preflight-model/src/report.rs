//! Final artifact of one diagnostic run.

use std::fmt;

use serde::Serialize;

use crate::category::DiagnosticCategory;
use crate::config::TargetConfig;
use crate::probe::{Fact, Omission, OpaqueError};
use crate::target::{ProbeDepth, Target};

/// Pipeline stage that produces a result line in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Authenticate,
    Probe,
}

impl Stage {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validate => "Configuration",
            Self::Authenticate => "Credentials",
            Self::Probe => "Connection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    /// Not attempted because an earlier stage failed.
    Skipped,
    /// The target does not need this stage.
    NotRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    pub facts: Vec<Fact>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omitted: Vec<Omission>,
}

impl StageResult {
    #[must_use]
    pub fn new(stage: Stage, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            facts: Vec::new(),
            omitted: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_facts(mut self, facts: Vec<Fact>) -> Self {
        self.facts = facts;
        self
    }

    #[must_use]
    pub fn with_omitted(mut self, omitted: Vec<Omission>) -> Self {
        self.omitted = omitted;
        self
    }
}

/// Classified failure attached to a failed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub stage: Stage,
    pub category: DiagnosticCategory,
    /// Specific problems found locally (missing keys, missing fields).
    pub problems: Vec<String>,
    /// Raw error, when the failure came from a remote call or parser.
    pub error: Option<OpaqueError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Passed,
    Failed,
}

/// Outcome of one pipeline run, rendered once and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub target: Target,
    pub depth: ProbeDepth,
    pub status: ReportStatus,
    pub config: TargetConfig,
    pub stages: Vec<StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
}

impl DiagnosticReport {
    #[must_use]
    pub fn passed(
        target: Target,
        depth: ProbeDepth,
        config: TargetConfig,
        stages: Vec<StageResult>,
    ) -> Self {
        Self {
            target,
            depth,
            status: ReportStatus::Passed,
            config,
            stages,
            diagnosis: None,
        }
    }

    #[must_use]
    pub fn failed(
        target: Target,
        depth: ProbeDepth,
        config: TargetConfig,
        stages: Vec<StageResult>,
        diagnosis: Diagnosis,
    ) -> Self {
        Self {
            target,
            depth,
            status: ReportStatus::Failed,
            config,
            stages,
            diagnosis: Some(diagnosis),
        }
    }

    /// Report for a fault outside the anticipated failure set.
    #[must_use]
    pub fn internal_fault(target: Target, depth: ProbeDepth, message: impl Into<String>) -> Self {
        let diagnosis = Diagnosis {
            stage: Stage::Probe,
            category: DiagnosticCategory::Unknown,
            problems: Vec::new(),
            error: Some(OpaqueError::new("EINTERNAL", message)),
        };
        Self::failed(
            target,
            depth,
            TargetConfig::empty(target),
            Vec::new(),
            diagnosis,
        )
    }

    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == ReportStatus::Passed
    }

    /// Process exit code for this report.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ReportStatus::Passed => 0,
            ReportStatus::Failed => 1,
        }
    }

    #[must_use]
    pub fn category(&self) -> Option<DiagnosticCategory> {
        self.diagnosis.as_ref().map(|d| d.category)
    }

    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|result| result.stage == stage)
    }
}
