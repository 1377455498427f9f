//! Google Sheets API v4 client.

use std::time::Duration;

use preflight_core::{ServiceAccountKey, SheetsAuthorizer, SheetsClient, SpreadsheetMeta, TabMeta};
use preflight_model::OpaqueError;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RemoteError;
use crate::oauth;

/// Sheets API base URL.
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Metadata fields requested; everything else is left out of the response.
const METADATA_FIELDS: &str =
    "properties.title,sheets.properties(title,gridProperties(rowCount,columnCount))";

const CLIENT_USER_AGENT: &str = concat!("preflight/", env!("CARGO_PKG_VERSION"));

/// Authorizes service accounts against Google's token endpoint.
pub struct GoogleSheetsAuthorizer {
    http: Client,
}

impl GoogleSheetsAuthorizer {
    /// Create an authorizer whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl SheetsAuthorizer for GoogleSheetsAuthorizer {
    fn authorize(
        &self,
        key: &ServiceAccountKey,
        scope: &str,
    ) -> Result<Box<dyn SheetsClient>, OpaqueError> {
        let token = oauth::fetch_token(&self.http, key, scope)?;
        Ok(Box::new(GoogleSheetsClient {
            http: self.http.clone(),
            token,
        }))
    }
}

/// Bearer-authorized Sheets client.
pub struct GoogleSheetsClient {
    http: Client,
    token: String,
}

impl GoogleSheetsClient {
    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        debug!(path = url.path(), "sheets request");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl SheetsClient for GoogleSheetsClient {
    fn metadata(&mut self, sheet_id: &str) -> Result<SpreadsheetMeta, OpaqueError> {
        let mut url = spreadsheet_url(sheet_id, &[])?;
        url.query_pairs_mut().append_pair("fields", METADATA_FIELDS);
        let response: SpreadsheetResponse = self.get(url)?;
        Ok(response.into())
    }

    fn values(&mut self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, OpaqueError> {
        let url = spreadsheet_url(sheet_id, &["values", range])?;
        let response: ValueRange = self.get(url)?;
        Ok(response.into_rows())
    }
}

/// Builds `{base}/{sheet_id}/{segments..}` with each segment percent-encoded.
fn spreadsheet_url(sheet_id: &str, segments: &[&str]) -> Result<Url, OpaqueError> {
    let invalid = || OpaqueError::new("EINVAL", "invalid spreadsheet URL");
    let mut url = Url::parse(SHEETS_API_URL).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .push(sheet_id)
        .extend(segments);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    #[serde(default)]
    properties: SheetProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

impl From<SpreadsheetResponse> for SpreadsheetMeta {
    fn from(response: SpreadsheetResponse) -> Self {
        Self {
            title: response.properties.title,
            tabs: response
                .sheets
                .into_iter()
                .map(|sheet| TabMeta {
                    title: sheet.properties.title,
                    rows: sheet.properties.grid_properties.row_count,
                    columns: sheet.properties.grid_properties.column_count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range holds no data.
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Interprets a failed Sheets API response.
pub fn api_error(status: u16, body: String) -> RemoteError {
    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(parsed) => RemoteError::Api {
            status: if parsed.error.status.is_empty() {
                status.to_string()
            } else {
                parsed.error.status
            },
            message: parsed.error.message,
            body,
        },
        Err(_) => RemoteError::Api {
            status: status.to_string(),
            message: format!("Sheets API returned HTTP {status}"),
            body,
        },
    }
}
