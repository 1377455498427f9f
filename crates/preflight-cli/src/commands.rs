use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{error, info, info_span};

use preflight_cli::env::EnvSource;
use preflight_core::{
    DatabaseProbe, DiagnosticPipeline, SpreadsheetProbe, Style, advisories, render,
    render_env_check, validate,
};
use preflight_model::{DiagnosticReport, ProbeDepth, Target};
use preflight_remote::{GoogleSheetsAuthorizer, PostgresConnector};

use crate::summary::print_summary;

/// Settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub style: Style,
    pub timeout: Duration,
}

/// `preflight env`: dump the database variables.
pub fn run_env(ctx: RunContext) -> i32 {
    let result = validate(Target::Database, &EnvSource);
    let facts = advisories(result.config());
    print_lines(&render_env_check(&result, &facts, &ctx.style));
    if result.is_valid() { 0 } else { 1 }
}

/// `preflight ping`: bare database probe.
pub fn run_ping(ctx: RunContext) -> i32 {
    let report = database_report(ctx, ProbeDepth::Bare);
    finish(&report, ctx)
}

/// `preflight db`: full database diagnostics.
pub fn run_db(ctx: RunContext) -> i32 {
    let report = database_report(ctx, ProbeDepth::Full);
    finish(&report, ctx)
}

/// `preflight sheets`: spreadsheet diagnostics.
pub fn run_sheets(ctx: RunContext) -> i32 {
    let report = spreadsheet_report(ctx);
    finish(&report, ctx)
}

/// `preflight all`: both targets, then a summary table.
pub fn run_all(ctx: RunContext) -> i32 {
    let reports = [
        database_report(ctx, ProbeDepth::Full),
        spreadsheet_report(ctx),
    ];
    for report in &reports {
        print_lines(&render(report, &ctx.style));
        println!();
    }
    print_summary(&reports);
    if reports.iter().all(DiagnosticReport::is_passed) {
        0
    } else {
        1
    }
}

fn database_report(ctx: RunContext, depth: ProbeDepth) -> DiagnosticReport {
    guarded(Target::Database, depth, || {
        let connector = Box::new(PostgresConnector::new());
        let probe = match depth {
            ProbeDepth::Bare => DatabaseProbe::bare(connector, ctx.timeout),
            ProbeDepth::Full => DatabaseProbe::new(connector, ctx.timeout),
        };
        DiagnosticPipeline::new(Target::Database, depth, probe).run(&EnvSource)
    })
}

fn spreadsheet_report(ctx: RunContext) -> DiagnosticReport {
    guarded(Target::Spreadsheet, ProbeDepth::Full, || {
        let authorizer = match GoogleSheetsAuthorizer::new(ctx.timeout) {
            Ok(authorizer) => authorizer,
            Err(err) => {
                return DiagnosticReport::internal_fault(
                    Target::Spreadsheet,
                    ProbeDepth::Full,
                    format!("failed to create HTTP client: {err}"),
                );
            }
        };
        let probe = SpreadsheetProbe::new(Box::new(authorizer));
        DiagnosticPipeline::new(Target::Spreadsheet, ProbeDepth::Full, probe).run(&EnvSource)
    })
}

/// Runs one diagnostic, turning a panic into an internal-fault report.
fn guarded(
    target: Target,
    depth: ProbeDepth,
    run: impl FnOnce() -> DiagnosticReport,
) -> DiagnosticReport {
    let span = info_span!("diagnose", service = %target);
    let _guard = span.enter();
    info!("starting diagnostics");
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(report) => {
            info!(passed = report.is_passed(), "diagnostics finished");
            report
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(%message, "diagnostics aborted");
            DiagnosticReport::internal_fault(target, depth, message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected internal error".to_string())
}

fn finish(report: &DiagnosticReport, ctx: RunContext) -> i32 {
    print_lines(&render(report, &ctx.style));
    report.exit_code()
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
