//! Fixed set of diagnostic categories and their remediation checklists.

use std::fmt;

use serde::Serialize;

use crate::target::Target;

/// Classified reason a diagnostic run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    MissingConfig,
    HostUnreachable,
    ConnectionRefused,
    AuthFailed,
    ResourceNotFound,
    PermissionDenied,
    ApiDisabled,
    MalformedCredentials,
    Unknown,
}

impl DiagnosticCategory {
    pub const ALL: [DiagnosticCategory; 9] = [
        Self::MissingConfig,
        Self::HostUnreachable,
        Self::ConnectionRefused,
        Self::AuthFailed,
        Self::ResourceNotFound,
        Self::PermissionDenied,
        Self::ApiDisabled,
        Self::MalformedCredentials,
        Self::Unknown,
    ];

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::MissingConfig => "Missing configuration",
            Self::HostUnreachable => "Host unreachable",
            Self::ConnectionRefused => "Connection refused",
            Self::AuthFailed => "Authentication failed",
            Self::ResourceNotFound => "Resource not found",
            Self::PermissionDenied => "Permission denied",
            Self::ApiDisabled => "API disabled",
            Self::MalformedCredentials => "Malformed credentials",
            Self::Unknown => "Unknown error",
        }
    }

    /// Static checklist telling the user what to look at.
    #[must_use]
    pub fn remediation(self, target: Target) -> &'static [&'static str] {
        match (self, target) {
            (Self::MissingConfig, Target::Database) => &[
                "Add the missing DB_* variables to your .env file",
                "Values must not be empty or whitespace only",
                "DB_PORT must be a number, DB_SSL should be 'true' for NeonDB",
            ],
            (Self::MissingConfig, Target::Spreadsheet) => &[
                "Add the missing variables to your .env file, for example:",
                "GOOGLE_CREDENTIALS_PATH=./credentials/google-service-account.json",
                "GOOGLE_SHEET_ID=your-sheet-id-here",
            ],
            (Self::HostUnreachable, Target::Database) => &[
                "Check if DB_HOST is correct",
                "Verify your internet connection",
                "Ensure the NeonDB cluster is active",
            ],
            (Self::HostUnreachable, Target::Spreadsheet) => &[
                "Verify your internet connection",
                "Check that sheets.googleapis.com is reachable from this network",
                "Check proxy and firewall settings",
            ],
            (Self::ConnectionRefused, Target::Database) => &[
                "Check if DB_PORT is correct (should be 5432)",
                "Verify firewall settings",
            ],
            (Self::ConnectionRefused, Target::Spreadsheet) => &[
                "Check proxy and firewall settings",
                "Verify that outbound HTTPS (port 443) is allowed",
            ],
            (Self::AuthFailed, Target::Database) => &[
                "Check if DB_USER is correct",
                "Verify DB_PASSWORD is correct",
                "No extra spaces or quotes in .env values",
            ],
            (Self::AuthFailed, Target::Spreadsheet) => &[
                "The service account key may have been revoked or deleted",
                "Create a new key in Google Cloud Console and download it again",
                "Check that the system clock is correct",
            ],
            (Self::ResourceNotFound, Target::Database) => &[
                "Check if DB_NAME matches the database name in NeonDB",
                "Database names are case-sensitive",
            ],
            (Self::ResourceNotFound, Target::Spreadsheet) => &[
                "Sheet ID is incorrect",
                "Sheet does not exist",
                "Check the URL of your Google Sheet for the correct ID",
            ],
            (Self::PermissionDenied, Target::Database) => &[
                "Grant DB_USER access to the database",
                "Check the role's privileges in the NeonDB console",
            ],
            (Self::PermissionDenied, Target::Spreadsheet) => &[
                "Sheet is not shared with the service account",
                "Share the sheet with the service account's client_email",
                "Grant at least \"Viewer\" permission",
            ],
            (Self::ApiDisabled, _) => &[
                "Google Sheets API is not enabled in your project",
                "Go to Google Cloud Console -> APIs & Services -> Library",
                "Search for \"Google Sheets API\" and enable it",
            ],
            (Self::MalformedCredentials, _) => &[
                "Make sure the credentials file exists at GOOGLE_CREDENTIALS_PATH",
                "Make sure the file is valid JSON with client_email, private_key and project_id",
                "Re-download the credentials from Google Cloud Console",
            ],
            (Self::Unknown, _) => &["See raw error details below."],
        }
    }
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_remediation_for_every_target() {
        for category in DiagnosticCategory::ALL {
            for target in Target::ALL {
                assert!(!category.remediation(target).is_empty(), "{category:?}");
            }
        }
    }

    #[test]
    fn unknown_points_at_raw_details() {
        assert_eq!(
            DiagnosticCategory::Unknown.remediation(Target::Database),
            &["See raw error details below."]
        );
    }
}
