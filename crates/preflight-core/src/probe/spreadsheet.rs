//! Google Sheets probe.
//!
//! Credential loading happens in [`ServiceProbe::authenticate`] and never
//! touches the network. The live sub-checks authorize a read-only client,
//! fetch the spreadsheet metadata and read a small preview range.

use std::path::Path;

use preflight_model::target::{GOOGLE_CREDENTIALS_PATH, GOOGLE_SHEET_ID};
use preflight_model::{DiagnosticCategory, Fact, OpaqueError, ProbeOutcome, TargetConfig};

use super::{ServiceProbe, StageFailure, SubCheck, run_checks};
use crate::credentials::{self, ServiceAccountKey};

/// OAuth scope requested for the probe.
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Cells read by the preview sub-check.
const PREVIEW_CELLS: &str = "A1:Z10";

/// Rows and columns shown in the preview.
const PREVIEW_ROWS: usize = 5;
const PREVIEW_COLUMNS: usize = 5;

/// Spreadsheet metadata needed by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetMeta {
    pub title: String,
    pub tabs: Vec<TabMeta>,
}

/// One tab (sheet) of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabMeta {
    pub title: String,
    pub rows: u32,
    pub columns: u32,
}

/// Authorized Sheets API client.
pub trait SheetsClient {
    fn metadata(&mut self, sheet_id: &str) -> Result<SpreadsheetMeta, OpaqueError>;

    /// Cell values of `range`, row-major. Trailing empty rows are omitted.
    fn values(&mut self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, OpaqueError>;
}

/// Exchanges a service-account key for an authorized client.
pub trait SheetsAuthorizer {
    fn authorize(
        &self,
        key: &ServiceAccountKey,
        scope: &str,
    ) -> Result<Box<dyn SheetsClient>, OpaqueError>;
}

struct SheetsContext<'a> {
    authorizer: &'a dyn SheetsAuthorizer,
    key: &'a ServiceAccountKey,
    sheet_id: &'a str,
    client: Option<Box<dyn SheetsClient>>,
    meta: Option<SpreadsheetMeta>,
}

impl SheetsContext<'_> {
    fn client(&mut self) -> Result<&mut Box<dyn SheetsClient>, OpaqueError> {
        self.client
            .as_mut()
            .ok_or_else(|| OpaqueError::new("ENOTCONN", "Sheets client is not authorized"))
    }
}

fn authorize(ctx: &mut SheetsContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    tracing::debug!(client_email = %ctx.key.client_email, "authorizing service account");
    let client = ctx.authorizer.authorize(ctx.key, READONLY_SCOPE)?;
    ctx.client = Some(client);
    Ok(vec![Fact::info("Sheets API", "initialized (spreadsheets.readonly)")])
}

fn metadata(ctx: &mut SheetsContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let sheet_id = ctx.sheet_id;
    let meta = ctx.client()?.metadata(sheet_id)?;

    let mut facts = vec![
        Fact::info("Sheet title", meta.title.clone()),
        Fact::info("Sheet URL", sheet_url(sheet_id)),
        Fact::info("Number of sheets", meta.tabs.len().to_string()),
    ];
    facts.extend(meta.tabs.iter().enumerate().map(|(index, tab)| {
        Fact::info(
            format!("Sheet {}", index + 1),
            format!("{} ({} rows × {} columns)", tab.title, tab.rows, tab.columns),
        )
    }));
    ctx.meta = Some(meta);
    Ok(facts)
}

fn preview(ctx: &mut SheetsContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let Some(first_tab) = ctx
        .meta
        .as_ref()
        .and_then(|meta| meta.tabs.first())
        .map(|tab| tab.title.clone())
    else {
        return Ok(vec![empty_fact()]);
    };

    let sheet_id = ctx.sheet_id;
    let rows = ctx.client()?.values(sheet_id, &preview_range(&first_tab))?;
    Ok(preview_facts(&rows))
}

fn empty_fact() -> Fact {
    Fact::info("Rows", "0 (empty)")
}

/// A1 range covering the preview cells of `tab`.
#[must_use]
pub fn preview_range(tab: &str) -> String {
    format!("'{}'!{PREVIEW_CELLS}", tab.replace('\'', "''"))
}

/// Browser URL of a spreadsheet.
#[must_use]
pub fn sheet_url(sheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{sheet_id}")
}

fn preview_facts(rows: &[Vec<String>]) -> Vec<Fact> {
    if rows.is_empty() {
        return vec![empty_fact()];
    }

    let mut facts = vec![Fact::info("Rows", format!("{} retrieved", rows.len()))];
    for (index, row) in rows.iter().take(PREVIEW_ROWS).enumerate() {
        let mut line = row
            .iter()
            .take(PREVIEW_COLUMNS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if row.len() > PREVIEW_COLUMNS {
            line.push_str("...");
        }
        facts.push(Fact::info(format!("Row {}", index + 1), line));
    }
    if rows.len() > PREVIEW_ROWS {
        facts.push(Fact::info(
            "Preview",
            format!("... and {} more rows", rows.len() - PREVIEW_ROWS),
        ));
    }
    facts
}

fn checks<'a>() -> [SubCheck<SheetsContext<'a>>; 3] {
    [
        SubCheck::required("authorize client", authorize),
        SubCheck::required("spreadsheet metadata", metadata),
        SubCheck::optional("data preview", preview),
    ]
}

/// Probes a spreadsheet through a [`SheetsAuthorizer`].
pub struct SpreadsheetProbe {
    authorizer: Box<dyn SheetsAuthorizer>,
    key: Option<ServiceAccountKey>,
}

impl SpreadsheetProbe {
    pub fn new(authorizer: Box<dyn SheetsAuthorizer>) -> Self {
        Self {
            authorizer,
            key: None,
        }
    }

    /// Key loaded by the last successful `authenticate`.
    #[must_use]
    pub fn key(&self) -> Option<&ServiceAccountKey> {
        self.key.as_ref()
    }
}

impl ServiceProbe for SpreadsheetProbe {
    fn requires_authentication(&self) -> bool {
        true
    }

    fn authenticate(&mut self, config: &TargetConfig) -> Result<Vec<Fact>, StageFailure> {
        let path = config.get(GOOGLE_CREDENTIALS_PATH).unwrap_or_default();
        let loaded = credentials::locate(Path::new(path))
            .and_then(|resolved| credentials::load(&resolved).map(|key| (resolved, key)));

        match loaded {
            Ok((resolved, key)) => {
                let file_name = resolved
                    .file_name()
                    .map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned());
                let facts = vec![
                    Fact::info("Credentials file", file_name),
                    Fact::info("Service account", key.client_email.clone()),
                    Fact::info("Project ID", key.project_id.clone()),
                ];
                self.key = Some(key);
                Ok(facts)
            }
            Err(err) => {
                tracing::debug!(identifier = err.identifier(), "credential loading failed");
                Err(StageFailure {
                    category: DiagnosticCategory::MalformedCredentials,
                    problems: err.problems(),
                    error: Some(err.to_opaque()),
                })
            }
        }
    }

    fn probe(&mut self, config: &TargetConfig) -> ProbeOutcome {
        let Some(key) = self.key.as_ref() else {
            return ProbeOutcome::Failure {
                error: OpaqueError::new("ENOCREDENTIALS", "credentials were not loaded"),
            };
        };
        let mut context = SheetsContext {
            authorizer: self.authorizer.as_ref(),
            key,
            sheet_id: config.get(GOOGLE_SHEET_ID).unwrap_or_default(),
            client: None,
            meta: None,
        };
        run_checks(&mut context, &checks())
    }
}
