//! Fail-fast diagnostic pipeline.
//!
//! `Init → Validating → Authenticating → Probing → Reporting → Done`.
//! A failing stage jumps straight to `Reporting`; later stages are marked
//! skipped. [`DiagnosticPipeline::run`] consumes the pipeline, so a run
//! cannot be repeated.

use preflight_model::{
    DiagnosticReport, Diagnosis, DiagnosticCategory, ProbeDepth, ProbeOutcome, Stage, StageResult,
    StageStatus, Target, TargetConfig, ValidationResult,
};

use crate::classify::classify;
use crate::probe::ServiceProbe;
use crate::validate::{ConfigSource, advisories, validate};

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Init,
    Validating,
    Authenticating,
    Probing,
    Reporting,
    Done,
}

/// One diagnostic run for a target.
pub struct DiagnosticPipeline<P> {
    target: Target,
    depth: ProbeDepth,
    probe: P,
    state: PipelineState,
    stages: Vec<StageResult>,
}

impl<P: ServiceProbe> DiagnosticPipeline<P> {
    pub fn new(target: Target, depth: ProbeDepth, probe: P) -> Self {
        Self {
            target,
            depth,
            probe,
            state: PipelineState::Init,
            stages: Vec::with_capacity(3),
        }
    }

    /// Runs every stage and returns the report.
    pub fn run(mut self, source: &dyn ConfigSource) -> DiagnosticReport {
        self.advance(PipelineState::Validating);
        let config = match validate(self.target, source) {
            ValidationResult::Valid(config) => config,
            ValidationResult::Invalid {
                config,
                missing,
                malformed,
            } => {
                let problems = missing
                    .iter()
                    .map(|key| (*key).to_string())
                    .chain(malformed.iter().map(|(key, reason)| format!("{key}: {reason}")))
                    .collect();
                return self.fail(
                    config,
                    Diagnosis {
                        stage: Stage::Validate,
                        category: DiagnosticCategory::MissingConfig,
                        problems,
                        error: None,
                    },
                );
            }
        };
        self.stages.push(
            StageResult::new(Stage::Validate, StageStatus::Passed).with_facts(advisories(&config)),
        );

        self.advance(PipelineState::Authenticating);
        if self.probe.requires_authentication() {
            match self.probe.authenticate(&config) {
                Ok(facts) => self.stages.push(
                    StageResult::new(Stage::Authenticate, StageStatus::Passed).with_facts(facts),
                ),
                Err(failure) => {
                    return self.fail(
                        config,
                        Diagnosis {
                            stage: Stage::Authenticate,
                            category: failure.category,
                            problems: failure.problems,
                            error: failure.error,
                        },
                    );
                }
            }
        } else {
            self.stages
                .push(StageResult::new(Stage::Authenticate, StageStatus::NotRequired));
        }

        self.advance(PipelineState::Probing);
        match self.probe.probe(&config) {
            ProbeOutcome::Success { facts, omitted } => {
                self.stages.push(
                    StageResult::new(Stage::Probe, StageStatus::Passed)
                        .with_facts(facts)
                        .with_omitted(omitted),
                );
                self.advance(PipelineState::Reporting);
                let stages = std::mem::take(&mut self.stages);
                let report = DiagnosticReport::passed(self.target, self.depth, config, stages);
                self.advance(PipelineState::Done);
                report
            }
            ProbeOutcome::Failure { error } => {
                let category = classify(&error);
                self.fail(
                    config,
                    Diagnosis {
                        stage: Stage::Probe,
                        category,
                        problems: Vec::new(),
                        error: Some(error),
                    },
                )
            }
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "pipeline moved backwards");
        tracing::debug!(
            service = %self.target,
            from = ?self.state,
            to = ?next,
            "pipeline transition"
        );
        self.state = next;
    }

    /// Marks the current stage failed, the rest skipped, and builds the report.
    fn fail(mut self, config: TargetConfig, diagnosis: Diagnosis) -> DiagnosticReport {
        let failed = diagnosis.stage;
        self.stages.push(StageResult::new(failed, StageStatus::Failed));
        // Stages after the failed one were never attempted.
        for stage in [Stage::Validate, Stage::Authenticate, Stage::Probe] {
            if self.stages.iter().all(|result| result.stage != stage) {
                self.stages.push(StageResult::new(stage, StageStatus::Skipped));
            }
        }
        self.advance(PipelineState::Reporting);
        tracing::debug!(
            service = %self.target,
            stage = ?failed,
            category = ?diagnosis.category,
            "pipeline failed"
        );
        let stages = std::mem::take(&mut self.stages);
        let report = DiagnosticReport::failed(self.target, self.depth, config, stages, diagnosis);
        self.advance(PipelineState::Done);
        report
    }
}
