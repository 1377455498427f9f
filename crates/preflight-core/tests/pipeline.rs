mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{
    FakeAuthorizer, FakeConnector, SERVICE_ACCOUNT_JSON, SIZE_QUERY, database_env, spreadsheet_env,
};
use preflight_core::{
    DatabaseProbe, DiagnosticPipeline, SpreadsheetMeta, SpreadsheetProbe, Style, render,
};
use preflight_model::target::{DB_HOST, DB_PASSWORD, DB_PORT};
use preflight_model::{
    DiagnosticCategory, DiagnosticReport, Fact, OpaqueError, ProbeDepth, Stage, StageStatus,
    Target,
};
use proptest::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(5);

fn run_database(connector: FakeConnector, env: &HashMap<String, String>) -> DiagnosticReport {
    let probe = DatabaseProbe::new(Box::new(connector), TIMEOUT);
    DiagnosticPipeline::new(Target::Database, ProbeDepth::Full, probe).run(env)
}

fn probe_labels(report: &DiagnosticReport) -> Vec<String> {
    report
        .stage(Stage::Probe)
        .map(|stage| stage.facts.iter().map(|fact| fact.label.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn scenario_a_empty_host_is_reported_as_missing() {
    let connector = FakeConnector::healthy();
    let counters = connector.counters.clone();
    let mut env = database_env();
    env.insert(DB_HOST.to_string(), String::new());

    let report = run_database(connector, &env);

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.category(), Some(DiagnosticCategory::MissingConfig));
    let diagnosis = report.diagnosis.as_ref().expect("diagnosis");
    assert_eq!(diagnosis.problems, vec![DB_HOST.to_string()]);
    assert_eq!(diagnosis.stage, Stage::Validate);
    assert_eq!(
        report.stage(Stage::Probe).map(|s| s.status),
        Some(StageStatus::Skipped)
    );
    assert_eq!(counters.connects.get(), 0);
}

#[test]
fn scenario_b_dns_failure_is_host_unreachable() {
    let connector = FakeConnector::unreachable(OpaqueError::new(
        "ENOTFOUND",
        "failed to lookup address information: Name or service not known",
    ));
    let counters = connector.counters.clone();

    let report = run_database(connector, &database_env());

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.category(), Some(DiagnosticCategory::HostUnreachable));
    let text = render(&report, &Style::plain()).join("\n");
    assert!(text.contains("Check if DB_HOST is correct"));
    assert!(text.contains("Verify your internet connection"));
    assert_eq!(counters.closes.get(), 0);
}

#[test]
fn connect_timeout_is_host_unreachable() {
    let connector = FakeConnector::unreachable(OpaqueError::new(
        "ETIMEDOUT",
        "database connect timed out after 5s",
    ));
    let counters = connector.counters.clone();

    let report = run_database(connector, &database_env());

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.category(), Some(DiagnosticCategory::HostUnreachable));
    let diagnosis = report.diagnosis.as_ref().expect("diagnosis");
    assert_eq!(diagnosis.stage, Stage::Probe);
    let text = render(&report, &Style::plain()).join("\n");
    assert!(text.contains("ETIMEDOUT"));
    assert!(text.contains("Check if DB_HOST is correct"));
    assert_eq!(counters.connects.get(), 1);
    assert_eq!(counters.closes.get(), 0);
}

#[test]
fn stalled_liveness_query_is_host_unreachable() {
    let connector = FakeConnector::healthy().failing(
        "SELECT 1",
        OpaqueError::new("ETIMEDOUT", "database query timed out after 5s"),
    );
    let counters = connector.counters.clone();

    let report = run_database(connector, &database_env());

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.category(), Some(DiagnosticCategory::HostUnreachable));
    assert_eq!(counters.closes.get(), 1);
}

#[test]
fn password_whitespace_reaches_the_connector() {
    let connector = FakeConnector::healthy();
    let counters = connector.counters.clone();
    let mut env = database_env();
    env.insert(DB_PASSWORD.to_string(), "  pa ss  ".to_string());

    let report = run_database(connector, &env);

    assert!(report.is_passed());
    assert_eq!(*counters.passwords.borrow(), ["  pa ss  "]);
}

#[test]
fn scenario_c_success_lists_facts_in_order() {
    let connector = FakeConnector::healthy();
    let counters = connector.counters.clone();

    let report = run_database(connector, &database_env());

    assert!(report.is_passed());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        probe_labels(&report),
        [
            "Connected to",
            "Test query",
            "PostgreSQL version",
            "Database time",
            "SSL connection",
            "Database size",
            "Tables in database",
        ]
    );
    let probe = report.stage(Stage::Probe).expect("probe stage");
    assert_eq!(probe.facts[2], Fact::info("PostgreSQL version", "16.4"));
    assert_eq!(
        report.stage(Stage::Authenticate).map(|s| s.status),
        Some(StageStatus::NotRequired)
    );
    assert_eq!(counters.closes.get(), 1);
}

#[test]
fn optional_database_checks_never_fail_the_probe() {
    let optional = [
        "SELECT version()",
        "SELECT NOW()",
        "SHOW ssl",
        SIZE_QUERY,
        common::TABLES_QUERY,
    ];
    for sql in optional {
        let connector = FakeConnector::healthy()
            .failing(sql, OpaqueError::new("42501", "permission denied for function"));
        let counters = connector.counters.clone();

        let report = run_database(connector, &database_env());

        assert!(report.is_passed(), "{sql} turned the run into a failure");
        let probe = report.stage(Stage::Probe).expect("probe stage");
        assert_eq!(probe.omitted.len(), 1, "{sql}");
        assert_eq!(probe.facts.len(), 6, "{sql}");
        assert_eq!(counters.closes.get(), 1, "{sql}");
    }
}

#[test]
fn liveness_failure_is_classified_and_session_released() {
    let connector = FakeConnector::healthy().failing(
        "SELECT 1",
        OpaqueError::new("28P01", "password authentication failed for user \"app\""),
    );
    let counters = connector.counters.clone();

    let report = run_database(connector, &database_env());

    assert_eq!(report.category(), Some(DiagnosticCategory::AuthFailed));
    assert_eq!(counters.connects.get(), 1);
    assert_eq!(counters.closes.get(), 1);
    assert_eq!(counters.queries.borrow().as_slice(), ["SELECT 1"]);
}

#[test]
fn bare_probe_runs_one_query() {
    let connector = FakeConnector::healthy();
    let counters = connector.counters.clone();
    let probe = DatabaseProbe::bare(Box::new(connector), TIMEOUT);

    let report = DiagnosticPipeline::new(Target::Database, ProbeDepth::Bare, probe).run(&database_env());

    assert!(report.is_passed());
    assert_eq!(
        counters.queries.borrow().as_slice(),
        ["SELECT version(), NOW()"]
    );
    assert_eq!(counters.closes.get(), 1);
}

#[test]
fn non_standard_port_is_an_advisory_only() {
    let mut env = database_env();
    env.insert(DB_PORT.to_string(), "6543".to_string());

    let report = run_database(FakeConnector::healthy(), &env);

    assert!(report.is_passed());
    let validate = report.stage(Stage::Validate).expect("validate stage");
    assert_eq!(validate.facts.len(), 1);
    assert!(validate.facts[0].is_advisory());
}

#[test]
fn non_numeric_port_fails_validation() {
    let mut env = database_env();
    env.insert(DB_PORT.to_string(), "port".to_string());

    let report = run_database(FakeConnector::healthy(), &env);

    assert_eq!(report.category(), Some(DiagnosticCategory::MissingConfig));
    let problems = &report.diagnosis.as_ref().expect("diagnosis").problems;
    assert_eq!(problems, &vec!["DB_PORT: not a valid number: port".to_string()]);
}

fn write_credentials(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("google-service-account.json");
    std::fs::write(&path, contents).expect("write credentials");
    (dir, path)
}

fn run_spreadsheet(authorizer: FakeAuthorizer, env: &HashMap<String, String>) -> DiagnosticReport {
    let probe = SpreadsheetProbe::new(Box::new(authorizer));
    DiagnosticPipeline::new(Target::Spreadsheet, ProbeDepth::Full, probe).run(env)
}

#[test]
fn scenario_d_missing_private_key_stops_before_network() {
    let (_dir, path) = write_credentials(
        r#"{"project_id": "etl-demo", "client_email": "etl@etl-demo.iam.gserviceaccount.com"}"#,
    );
    let authorizer = FakeAuthorizer::with_rows(&[]);
    let counters = authorizer.counters.clone();

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    assert_eq!(report.exit_code(), 1);
    let diagnosis = report.diagnosis.as_ref().expect("diagnosis");
    assert_eq!(diagnosis.stage, Stage::Authenticate);
    assert_eq!(diagnosis.category, DiagnosticCategory::MalformedCredentials);
    assert_eq!(diagnosis.problems, vec!["private_key".to_string()]);
    assert_eq!(
        report.stage(Stage::Probe).map(|s| s.status),
        Some(StageStatus::Skipped)
    );
    assert_eq!(counters.authorizations.get(), 0);
}

#[test]
fn missing_credentials_file_is_malformed_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let authorizer = FakeAuthorizer::with_rows(&[]);
    let counters = authorizer.counters.clone();

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&dir.path().join("nope.json")));

    let diagnosis = report.diagnosis.as_ref().expect("diagnosis");
    assert_eq!(diagnosis.category, DiagnosticCategory::MalformedCredentials);
    assert_eq!(
        diagnosis.error.as_ref().map(|e| e.identifier.as_str()),
        Some("ENOENT")
    );
    assert_eq!(counters.authorizations.get(), 0);
}

#[test]
fn invalid_json_is_malformed_credentials() {
    let (_dir, path) = write_credentials("{ not json");

    let report = run_spreadsheet(FakeAuthorizer::with_rows(&[]), &spreadsheet_env(&path));

    assert_eq!(report.category(), Some(DiagnosticCategory::MalformedCredentials));
}

#[test]
fn scenario_e_empty_sheet_is_success() {
    let (_dir, path) = write_credentials(SERVICE_ACCOUNT_JSON);
    let authorizer = FakeAuthorizer::with_rows(&[]);
    let counters = authorizer.counters.clone();

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    assert!(report.is_passed());
    let probe = report.stage(Stage::Probe).expect("probe stage");
    assert_eq!(probe.facts[1], Fact::info("Sheet title", "Registrations"));
    assert_eq!(probe.facts[3], Fact::info("Number of sheets", "1"));
    assert_eq!(probe.facts.last(), Some(&Fact::info("Rows", "0 (empty)")));
    assert!(probe.omitted.is_empty());
    assert_eq!(
        counters.ranges.borrow().as_slice(),
        ["'Form Responses 1'!A1:Z10"]
    );

    let auth = report.stage(Stage::Authenticate).expect("auth stage");
    assert!(
        auth.facts
            .contains(&Fact::info("Service account", "etl@etl-demo.iam.gserviceaccount.com"))
    );
}

#[test]
fn spreadsheet_without_tabs_skips_preview() {
    let (_dir, path) = write_credentials(SERVICE_ACCOUNT_JSON);
    let mut authorizer = FakeAuthorizer::with_rows(&[]);
    authorizer.metadata = Ok(SpreadsheetMeta {
        title: "Blank".to_string(),
        tabs: Vec::new(),
    });
    let counters = authorizer.counters.clone();

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    assert!(report.is_passed());
    assert_eq!(
        probe_labels(&report).last().map(String::as_str),
        Some("Rows")
    );
    assert!(counters.ranges.borrow().is_empty());
}

#[test]
fn preview_rows_follow_metadata() {
    let (_dir, path) = write_credentials(SERVICE_ACCOUNT_JSON);
    let authorizer = FakeAuthorizer::with_rows(&[&["Name", "Email"], &["Ada", "ada@example.com"]]);

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    let labels = probe_labels(&report);
    assert_eq!(
        labels,
        [
            "Sheets API",
            "Sheet title",
            "Sheet URL",
            "Number of sheets",
            "Sheet 1",
            "Rows",
            "Row 1",
            "Row 2",
        ]
    );
}

#[test]
fn unshared_sheet_is_permission_denied() {
    let (_dir, path) = write_credentials(SERVICE_ACCOUNT_JSON);
    let mut authorizer = FakeAuthorizer::with_rows(&[]);
    authorizer.metadata = Err(OpaqueError::new(
        "PERMISSION_DENIED",
        "The caller does not have permission",
    ));

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    assert_eq!(report.category(), Some(DiagnosticCategory::PermissionDenied));
    assert_eq!(report.stage(Stage::Probe).map(|s| s.status), Some(StageStatus::Failed));
}

#[test]
fn revoked_key_is_auth_failure() {
    let (_dir, path) = write_credentials(SERVICE_ACCOUNT_JSON);
    let mut authorizer = FakeAuthorizer::with_rows(&[]);
    authorizer.authorize_error = Some(OpaqueError::new(
        "invalid_grant",
        "invalid_grant: Invalid JWT Signature.",
    ));
    let counters = authorizer.counters.clone();

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    assert_eq!(report.category(), Some(DiagnosticCategory::AuthFailed));
    assert_eq!(counters.metadata_calls.get(), 0);
}

#[test]
fn preview_failure_is_omitted() {
    let (_dir, path) = write_credentials(SERVICE_ACCOUNT_JSON);
    let mut authorizer = FakeAuthorizer::with_rows(&[]);
    authorizer.values = Err(OpaqueError::new("INVALID_ARGUMENT", "Unable to parse range"));

    let report = run_spreadsheet(authorizer, &spreadsheet_env(&path));

    assert!(report.is_passed());
    let probe = report.stage(Stage::Probe).expect("probe stage");
    assert_eq!(probe.omitted.len(), 1);
    assert_eq!(probe.omitted[0].check, "data preview");
}

proptest! {
    #[test]
    fn validation_reports_exactly_the_missing_keys(present in prop::collection::vec(any::<bool>(), 6)) {
        let keys = Target::Database.required_keys();
        let full = database_env();
        let env: HashMap<String, String> = keys
            .iter()
            .zip(&present)
            .filter(|(_, keep)| **keep)
            .map(|(key, _)| (key.name.to_string(), full[key.name].clone()))
            .collect();
        let expected: Vec<String> = keys
            .iter()
            .zip(&present)
            .filter(|(_, keep)| !**keep)
            .map(|(key, _)| key.name.to_string())
            .collect();

        let report = run_database(FakeConnector::healthy(), &env);

        match &report.diagnosis {
            None => prop_assert!(expected.is_empty()),
            Some(diagnosis) => {
                let mut problems = diagnosis.problems.clone();
                problems.sort();
                let mut expected = expected.clone();
                expected.sort();
                prop_assert_eq!(problems, expected);
            }
        }
    }
}
