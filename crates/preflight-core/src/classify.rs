//! Maps raw failures to diagnostic categories.
//!
//! Rules are evaluated top to bottom and the first match wins. The last
//! rule matches everything, so classification is total.

use preflight_model::{DiagnosticCategory, OpaqueError};

/// Identifiers reported when a host cannot be resolved or reached in time.
const UNREACHABLE_IDENTIFIERS: [&str; 5] =
    ["ENOTFOUND", "EAI_AGAIN", "ETIMEDOUT", "EHOSTUNREACH", "ENETUNREACH"];

const REFUSED_IDENTIFIERS: [&str; 1] = ["ECONNREFUSED"];

const AUTH_PHRASES: [&str; 4] = [
    "password authentication failed",
    "authentication failed",
    "invalid_grant",
    "invalid jwt signature",
];

const PERMISSION_PHRASES: [&str; 2] = ["does not have permission", "permission denied"];

const API_DISABLED_PHRASES: [&str; 2] = ["api has not been used", "it is disabled"];

const MALFORMED_PHRASES: [&str; 3] = ["unable to parse", "invalid credentials", "malformed"];

/// Lower-cased view of an error that rules match against.
struct Subject<'a> {
    identifier: &'a str,
    message: String,
}

impl Subject<'_> {
    fn identifier_is(&self, candidates: &[&str]) -> bool {
        candidates
            .iter()
            .any(|candidate| self.identifier.eq_ignore_ascii_case(candidate))
    }

    fn mentions_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| self.message.contains(phrase))
    }
}

struct Rule {
    category: DiagnosticCategory,
    matches: fn(&Subject<'_>) -> bool,
}

const RULES: [Rule; 8] = [
    Rule {
        category: DiagnosticCategory::HostUnreachable,
        matches: |s| s.identifier_is(&UNREACHABLE_IDENTIFIERS),
    },
    Rule {
        category: DiagnosticCategory::ConnectionRefused,
        matches: |s| s.identifier_is(&REFUSED_IDENTIFIERS),
    },
    Rule {
        category: DiagnosticCategory::AuthFailed,
        matches: |s| s.mentions_any(&AUTH_PHRASES),
    },
    Rule {
        category: DiagnosticCategory::ResourceNotFound,
        matches: |s| {
            (s.message.contains("database") && s.message.contains("does not exist"))
                || s.message.contains("requested entity was not found")
        },
    },
    Rule {
        category: DiagnosticCategory::PermissionDenied,
        matches: |s| s.mentions_any(&PERMISSION_PHRASES),
    },
    Rule {
        category: DiagnosticCategory::ApiDisabled,
        matches: |s| s.mentions_any(&API_DISABLED_PHRASES),
    },
    Rule {
        category: DiagnosticCategory::MalformedCredentials,
        matches: |s| s.mentions_any(&MALFORMED_PHRASES),
    },
    Rule {
        category: DiagnosticCategory::Unknown,
        matches: |_| true,
    },
];

/// Classifies a raw error. Never fails; unmatched errors are `Unknown`.
#[must_use]
pub fn classify(error: &OpaqueError) -> DiagnosticCategory {
    let subject = Subject {
        identifier: error.identifier.trim(),
        message: error.message.to_lowercase(),
    };
    let category = RULES
        .iter()
        .find(|rule| (rule.matches)(&subject))
        .map_or(DiagnosticCategory::Unknown, |rule| rule.category);
    tracing::debug!(
        identifier = %error.identifier,
        category = ?category,
        "classified failure"
    );
    category
}
