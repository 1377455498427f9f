//! Renders reports as display lines.
//!
//! Rendering is pure: the same report and style always give the same
//! lines. Facts are printed in the order the probe produced them.

use preflight_model::target::{DB_HOST, DB_PORT, DB_SSL};
use preflight_model::{
    DiagnosticReport, Diagnosis, Fact, KeyShape, Omission, ProbeDepth, Stage, StageResult,
    StageStatus, Target, TargetConfig, ValidationResult,
};

use crate::mask::{PASSWORD_DISPLAY_CAP, mask};
use crate::style::Style;
use crate::validate::ssl_enabled;

const MISSING: &str = "MISSING";

/// Renders a diagnostic report.
#[must_use]
pub fn render(report: &DiagnosticReport, style: &Style) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(style.header(&title(report.target, report.depth)));
    lines.push(String::new());

    if !report.stages.is_empty() {
        lines.push(style.info("Configuration:"));
        lines.extend(config_lines(&report.config, style));
        lines.push(String::new());
    }

    for stage in &report.stages {
        lines.extend(stage_lines(stage, style));
    }

    lines.push(String::new());
    match &report.diagnosis {
        None => lines.extend(success_footer(report.target, report.depth, style)),
        Some(diagnosis) => lines.extend(failure_footer(report.target, diagnosis, style)),
    }
    lines
}

fn title(target: Target, depth: ProbeDepth) -> String {
    match depth {
        ProbeDepth::Full => format!("Testing {} connection", target.service_name()),
        ProbeDepth::Bare => format!("{} connection test", target.service_name()),
    }
}

fn config_lines(config: &TargetConfig, style: &Style) -> Vec<String> {
    let width = config
        .entries()
        .map(|(key, _)| key.label.chars().count() + 1)
        .max()
        .unwrap_or(0);

    config
        .entries()
        .map(|(key, value)| {
            let shown = match value {
                None => style.bad(MISSING),
                Some(value) if key.secret => style.value(&mask(value, Some(PASSWORD_DISPLAY_CAP))),
                Some(value) if key.shape == KeyShape::Flag => {
                    let state = if ssl_enabled(Some(value)) {
                        "enabled"
                    } else {
                        "disabled"
                    };
                    style.value(state)
                }
                Some(value) => style.value(value),
            };
            format!("  {:<width$} {shown}", format!("{}:", key.label))
        })
        .collect()
}

fn stage_lines(result: &StageResult, style: &Style) -> Vec<String> {
    let name = result.stage.label();
    let mut lines = vec![match result.status {
        StageStatus::Passed => style.success(&format!("{name}: passed")),
        StageStatus::Failed => style.failure(&format!("{name}: failed")),
        StageStatus::Skipped => style.info(&format!("{name}: skipped")),
        StageStatus::NotRequired => style.info(&format!("{name}: not required")),
    }];
    lines.extend(result.facts.iter().map(|fact| fact_line(fact, style)));
    lines.extend(result.omitted.iter().map(|omission| omission_line(omission, style)));
    lines
}

fn fact_line(fact: &Fact, style: &Style) -> String {
    if fact.is_advisory() {
        format!("  {}", style.warning(&format!("{}: {}", fact.label, fact.value)))
    } else {
        format!("  {}: {}", fact.label, style.value(&fact.value))
    }
}

fn omission_line(omission: &Omission, style: &Style) -> String {
    format!(
        "  {}",
        style.warning(&format!(
            "{} unavailable ({})",
            omission.check, omission.error.message
        ))
    )
}

fn success_footer(target: Target, depth: ProbeDepth, style: &Style) -> Vec<String> {
    let mut lines = vec![
        style.header("Connection test successful!"),
        style.good(&format!(
            "Your {} connection is working.",
            target.service_name()
        )),
    ];
    if depth == ProbeDepth::Bare {
        return lines;
    }

    let reminders = reminders(target);
    let next_steps = next_steps(target);

    if !reminders.is_empty() {
        lines.push(String::new());
        lines.push(style.info("Important reminders:"));
        lines.extend(numbered(reminders));
    }
    lines.push(String::new());
    lines.push(style.value("You can now proceed with the next steps:"));
    lines.extend(numbered(next_steps));
    lines
}

fn reminders(target: Target) -> &'static [&'static str] {
    match target {
        Target::Database => &[],
        Target::Spreadsheet => &[
            "Make sure the sheet is shared with the service account shown above",
            "The service account should have at least \"Viewer\" permissions",
            "For ETL operations, you may need \"Editor\" permissions",
        ],
    }
}

fn next_steps(target: Target) -> &'static [&'static str] {
    match target {
        Target::Database => &[
            "Set up Google Sheets API",
            "Design your database schema",
            "Build the ETL pipeline",
        ],
        Target::Spreadsheet => &[
            "Design your database schema",
            "Build the ETL pipeline",
            "Create the auto-registration workflow",
        ],
    }
}

fn numbered(items: &[&str]) -> impl Iterator<Item = String> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("  {}. {item}", index + 1))
}

fn failure_footer(target: Target, diagnosis: &Diagnosis, style: &Style) -> Vec<String> {
    let mut lines = vec![
        style.header("Connection test failed"),
        style.failure(&format!(
            "{} ({} stage)",
            diagnosis.category.title(),
            diagnosis.stage.label()
        )),
    ];

    if !diagnosis.problems.is_empty() {
        lines.push(String::new());
        lines.push(style.bad(problems_heading(diagnosis.stage)));
        lines.extend(
            diagnosis
                .problems
                .iter()
                .map(|problem| format!("  {}", style.failure(problem))),
        );
    }

    lines.push(String::new());
    lines.push(style.warning("Possible issues:"));
    lines.extend(
        diagnosis
            .category
            .remediation(target)
            .iter()
            .map(|item| format!("  • {item}")),
    );

    if let Some(error) = &diagnosis.error {
        lines.push(String::new());
        lines.push(style.bad("Error details:"));
        lines.push(format!("  Type: {}", error.identifier));
        lines.push(format!("  Message: {}", error.message));
        if let Some(detail) = &error.detail {
            lines.push(String::new());
            lines.push("Full error response:".to_string());
            lines.extend(detail.lines().map(|line| format!("  {line}")));
        }
    }

    lines.push(String::new());
    lines.push(style.value(&format!("For help, see: {}", target.help_doc())));
    lines
}

fn problems_heading(stage: Stage) -> &'static str {
    match stage {
        Stage::Validate => "Missing or invalid environment variables:",
        Stage::Authenticate => "Credential problems:",
        Stage::Probe => "Problems:",
    }
}

/// Success line printed by the environment check for keys without advisories.
const ENV_CHECK_PASSES: [(&str, &str); 3] = [
    (DB_PORT, "DB_PORT is valid"),
    (DB_HOST, "DB_HOST appears to be a valid NeonDB host"),
    (DB_SSL, "DB_SSL is enabled"),
];

/// Renders the raw environment dump.
#[must_use]
pub fn render_env_check(
    result: &ValidationResult,
    advisories: &[Fact],
    style: &Style,
) -> Vec<String> {
    let mut lines = vec![
        style.header("=== Environment Variables Check ==="),
        String::new(),
    ];

    for (key, value) in result.config().entries() {
        lines.push(match value {
            None => style.failure(&format!("{}: MISSING or EMPTY", key.name)),
            Some(value) if key.secret => style.success(&format!(
                "{}: {} ({} characters)",
                key.name,
                mask(value, None),
                value.chars().count()
            )),
            Some(value) => style.success(&format!("{}: {value}", key.name)),
        });
    }
    lines.push(String::new());

    if let ValidationResult::Invalid { malformed, .. } = result {
        for (key, reason) in malformed {
            lines.push(style.failure(&format!("{key}: {reason}")));
        }
        lines.push(style.bad("ERROR: Some environment variables are missing or invalid!"));
        lines.push("Please check your .env file.".to_string());
        return lines;
    }

    lines.push(style.header("=== Validation Checks ==="));
    lines.push(String::new());
    if result.config().target() == Target::Database {
        for (key, message) in ENV_CHECK_PASSES {
            if let Some(advisory) = advisories.iter().find(|fact| fact.label == key) {
                lines.push(style.warning(&format!("{}: {}", advisory.label, advisory.value)));
            } else {
                let value = result.config().get(key).unwrap_or_default();
                lines.push(style.success(&format!("{message}: {value}")));
            }
        }
    } else {
        lines.extend(
            advisories
                .iter()
                .map(|fact| style.warning(&format!("{}: {}", fact.label, fact.value))),
        );
    }
    lines.push(String::new());
    lines.push(style.header("=== All checks complete ==="));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_model::target::{DB_NAME, DB_PASSWORD, DB_USER};
    use preflight_model::{DiagnosticCategory, OpaqueError};

    fn database_config() -> TargetConfig {
        TargetConfig::empty(Target::Database)
            .with(DB_HOST, "ep-cool-sun-123456.us-east-2.aws.neon.tech")
            .with(DB_PORT, "5432")
            .with(DB_NAME, "neondb")
            .with(DB_USER, "app")
            .with(DB_PASSWORD, "correct-horse-battery-staple")
            .with(DB_SSL, "true")
    }

    fn probe_failure(error: OpaqueError, category: DiagnosticCategory) -> DiagnosticReport {
        DiagnosticReport::failed(
            Target::Database,
            ProbeDepth::Full,
            database_config(),
            vec![
                StageResult::new(Stage::Validate, StageStatus::Passed),
                StageResult::new(Stage::Authenticate, StageStatus::NotRequired),
                StageResult::new(Stage::Probe, StageStatus::Failed),
            ],
            Diagnosis {
                stage: Stage::Probe,
                category,
                problems: Vec::new(),
                error: Some(error),
            },
        )
    }

    #[test]
    fn password_is_masked_and_capped() {
        let lines = render(
            &DiagnosticReport::passed(
                Target::Database,
                ProbeDepth::Full,
                database_config(),
                vec![StageResult::new(Stage::Probe, StageStatus::Passed)],
            ),
            &Style::plain(),
        );
        let text = lines.join("\n");
        assert!(!text.contains("correct-horse"));
        assert!(text.contains(&format!("Password: {}", "•".repeat(12))));
        assert!(text.contains("SSL:      enabled"));
    }

    #[test]
    fn failure_shows_remediation_and_raw_error() {
        let report = probe_failure(
            OpaqueError::new("ENOTFOUND", "failed to lookup address information"),
            DiagnosticCategory::HostUnreachable,
        );
        let lines = render(&report, &Style::plain());
        assert!(lines.contains(&"  • Check if DB_HOST is correct".to_string()));
        assert!(lines.contains(&"  Type: ENOTFOUND".to_string()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("For help, see: docs/NEONDB_SETUP_GUIDE.md")
        );
    }

    #[test]
    fn error_detail_is_printed_verbatim() {
        let error = OpaqueError::new("PERMISSION_DENIED", "The caller does not have permission")
            .with_detail("{\n  \"code\": 403\n}");
        let report = probe_failure(error, DiagnosticCategory::PermissionDenied);
        let lines = render(&report, &Style::plain());
        assert!(lines.contains(&"Full error response:".to_string()));
        assert!(lines.contains(&"    \"code\": 403".to_string()));
    }

    #[test]
    fn internal_fault_still_renders() {
        let report = DiagnosticReport::internal_fault(Target::Database, ProbeDepth::Bare, "boom");
        let lines = render(&report, &Style::plain());
        assert!(lines.contains(&"  • See raw error details below.".to_string()));
        assert!(lines.contains(&"  Message: boom".to_string()));
    }

    #[test]
    fn env_check_masks_password_with_length() {
        let result = ValidationResult::Valid(database_config());
        let lines = render_env_check(&result, &[], &Style::plain());
        assert!(lines.contains(&format!("✓ DB_PASSWORD: {} (28 characters)", "•".repeat(28))));
        assert!(lines.contains(&"✓ DB_PORT is valid: 5432".to_string()));
    }
}
