//! Diagnostic targets and their fixed configuration keys.

use std::fmt;

use serde::Serialize;

/// External service being diagnosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// PostgreSQL database (NeonDB).
    Database,
    /// Google Sheets spreadsheet read through a service account.
    Spreadsheet,
}

/// Expected shape of a configuration value beyond being non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyShape {
    /// Free text.
    Text,
    /// TCP port number (`u16`).
    Port,
    /// Boolean flag, enabled only by the literal `"true"`.
    Flag,
    /// Filesystem path.
    Path,
}

/// A configuration key required by a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredKey {
    /// Environment variable name.
    pub name: &'static str,
    /// Label used in the configuration summary.
    pub label: &'static str,
    /// Whether the value must be masked before display.
    pub secret: bool,
    /// Expected value shape.
    pub shape: KeyShape,
}

impl RequiredKey {
    const fn new(name: &'static str, label: &'static str, shape: KeyShape) -> Self {
        Self {
            name,
            label,
            secret: false,
            shape,
        }
    }

    const fn secret(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            secret: true,
            shape: KeyShape::Text,
        }
    }
}

pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_SSL: &str = "DB_SSL";
pub const GOOGLE_CREDENTIALS_PATH: &str = "GOOGLE_CREDENTIALS_PATH";
pub const GOOGLE_SHEET_ID: &str = "GOOGLE_SHEET_ID";

const DATABASE_KEYS: [RequiredKey; 6] = [
    RequiredKey::new(DB_HOST, "Host", KeyShape::Text),
    RequiredKey::new(DB_PORT, "Port", KeyShape::Port),
    RequiredKey::new(DB_NAME, "Database", KeyShape::Text),
    RequiredKey::new(DB_USER, "User", KeyShape::Text),
    RequiredKey::secret(DB_PASSWORD, "Password"),
    RequiredKey::new(DB_SSL, "SSL", KeyShape::Flag),
];

const SPREADSHEET_KEYS: [RequiredKey; 2] = [
    RequiredKey::new(GOOGLE_CREDENTIALS_PATH, "Credentials Path", KeyShape::Path),
    RequiredKey::new(GOOGLE_SHEET_ID, "Sheet ID", KeyShape::Text),
];

impl Target {
    /// All targets, in the order `preflight all` runs them.
    pub const ALL: [Target; 2] = [Target::Database, Target::Spreadsheet];

    /// Required keys, in display order.
    #[must_use]
    pub fn required_keys(self) -> &'static [RequiredKey] {
        match self {
            Self::Database => &DATABASE_KEYS,
            Self::Spreadsheet => &SPREADSHEET_KEYS,
        }
    }

    /// Looks up one of this target's keys by environment variable name.
    #[must_use]
    pub fn key(self, name: &str) -> Option<&'static RequiredKey> {
        self.required_keys().iter().find(|key| key.name == name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Spreadsheet => "spreadsheet",
        }
    }

    /// Human name of the remote service.
    #[must_use]
    pub const fn service_name(self) -> &'static str {
        match self {
            Self::Database => "NeonDB",
            Self::Spreadsheet => "Google Sheets API",
        }
    }

    /// Setup guide shown at the end of a failed run.
    #[must_use]
    pub const fn help_doc(self) -> &'static str {
        match self {
            Self::Database => "docs/NEONDB_SETUP_GUIDE.md",
            Self::Spreadsheet => "docs/GOOGLE_SHEETS_API_SETUP.md",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many sub-checks a probe runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeDepth {
    /// Connect and run a single query.
    Bare,
    /// Every sub-check of the target.
    #[default]
    Full,
}
