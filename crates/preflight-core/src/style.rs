//! Terminal styling passed to the reporter.

use owo_colors::OwoColorize;

/// Formatting helpers for report lines.
///
/// A `Style` is a plain value; callers decide whether colour is wanted and
/// pass it by reference to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    color: bool,
}

impl Style {
    /// No escape sequences.
    #[must_use]
    pub const fn plain() -> Self {
        Self { color: false }
    }

    /// ANSI colours.
    #[must_use]
    pub const fn colored() -> Self {
        Self { color: true }
    }

    #[must_use]
    pub const fn is_colored(self) -> bool {
        self.color
    }

    #[must_use]
    pub fn success(self, msg: &str) -> String {
        let mark = if self.color {
            "✓".green().to_string()
        } else {
            "✓".to_string()
        };
        format!("{mark} {msg}")
    }

    #[must_use]
    pub fn failure(self, msg: &str) -> String {
        let mark = if self.color {
            "✗".red().to_string()
        } else {
            "✗".to_string()
        };
        format!("{mark} {msg}")
    }

    #[must_use]
    pub fn info(self, msg: &str) -> String {
        let mark = if self.color {
            "ℹ".cyan().to_string()
        } else {
            "ℹ".to_string()
        };
        format!("{mark} {msg}")
    }

    #[must_use]
    pub fn warning(self, msg: &str) -> String {
        let mark = if self.color {
            "⚠".yellow().to_string()
        } else {
            "⚠".to_string()
        };
        format!("{mark} {msg}")
    }

    /// Bold section heading.
    #[must_use]
    pub fn header(self, msg: &str) -> String {
        if self.color {
            msg.bold().cyan().to_string()
        } else {
            msg.to_string()
        }
    }

    /// Highlighted value, e.g. a configuration entry.
    #[must_use]
    pub fn value(self, msg: &str) -> String {
        if self.color {
            msg.cyan().to_string()
        } else {
            msg.to_string()
        }
    }

    #[must_use]
    pub fn good(self, msg: &str) -> String {
        if self.color {
            msg.green().to_string()
        } else {
            msg.to_string()
        }
    }

    #[must_use]
    pub fn bad(self, msg: &str) -> String {
        if self.color {
            msg.red().to_string()
        } else {
            msg.to_string()
        }
    }
}
