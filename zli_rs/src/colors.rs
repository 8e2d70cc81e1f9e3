//! Terminal styling for diagnostics written to stderr.
//!
//! Colors are on only when stderr is a terminal and `NO_COLOR` is unset.

use std::io::IsTerminal;

use colored::Colorize;

/// Whether stderr output should be styled.
pub fn stderr_enabled() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Styler passed to the functions that format user-facing messages.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn for_stderr() -> Self {
        Self::new(stderr_enabled())
    }

    /// Failures - red, bold
    pub fn error(&self, s: &str) -> String {
        self.paint(s, |s| s.red().bold().to_string())
    }

    /// Secondary output such as generated source - dimmed
    pub fn dim(&self, s: &str) -> String {
        self.paint(s, |s| s.dimmed().to_string())
    }

    /// `Error: <message>` line.
    pub fn status_error(&self, message: &str) -> String {
        format!("{} {message}", self.error("Error:"))
    }

    fn paint(&self, s: &str, style: impl FnOnce(&str) -> String) -> String {
        if self.enabled {
            style(s)
        } else {
            s.to_string()
        }
    }
}
