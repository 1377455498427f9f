pub mod category;
pub mod config;
pub mod probe;
pub mod report;
pub mod target;

pub use category::DiagnosticCategory;
pub use config::{REDACTED_VALUE, TargetConfig, ValidationResult};
pub use probe::{Fact, FactLevel, Omission, OpaqueError, ProbeOutcome};
pub use report::{
    DiagnosticReport, Diagnosis, ReportStatus, Stage, StageResult, StageStatus,
};
pub use target::{KeyShape, ProbeDepth, RequiredKey, Target};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_exit_codes() {
        let config = TargetConfig::empty(Target::Database);
        let passed = DiagnosticReport::passed(
            Target::Database,
            ProbeDepth::Full,
            config.clone(),
            vec![],
        );
        assert_eq!(passed.exit_code(), 0);

        let failed = DiagnosticReport::failed(
            Target::Database,
            ProbeDepth::Full,
            config,
            vec![],
            Diagnosis {
                stage: Stage::Validate,
                category: DiagnosticCategory::MissingConfig,
                problems: vec!["DB_HOST".to_string()],
                error: None,
            },
        );
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.category(), Some(DiagnosticCategory::MissingConfig));
    }

    #[test]
    fn internal_fault_is_unknown_failure() {
        let report = DiagnosticReport::internal_fault(Target::Spreadsheet, ProbeDepth::Full, "boom");
        assert!(!report.is_passed());
        assert_eq!(report.category(), Some(DiagnosticCategory::Unknown));
    }

    #[test]
    fn report_serializes() {
        let report = DiagnosticReport::passed(
            Target::Spreadsheet,
            ProbeDepth::Full,
            TargetConfig::empty(Target::Spreadsheet),
            vec![
                StageResult::new(Stage::Validate, StageStatus::Passed)
                    .with_facts(vec![Fact::info("Sheet ID", "abc")]),
            ],
        );
        let value = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(value["status"], "passed");
        assert_eq!(value["stages"][0]["facts"][0]["label"], "Sheet ID");
        assert!(value.get("diagnosis").is_none());
    }
}
