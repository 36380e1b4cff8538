//! Terminal rendering of failures.
//!
//! ```text
//! error: `clang` failed with exit code Some(1)
//!   --> /work/foo.def
//!   | stubs.c:3:10: fatal error: 'foo.h' file not found
//!   = help: Re-run with `--verbose` to see the exact compiler and linker commands
//! ```

use std::fmt;
use std::path::PathBuf;

/// Help texts shared by several failure sites.
pub mod suggestions {
    /// The native compiler or linker failed.
    pub const VERBOSE_COMMANDS: &str =
        "Re-run with `--verbose` to see the exact compiler and linker commands";

    /// A library could not be resolved.
    pub const LIBRARY_NOT_FOUND: &str =
        "Pass the directory containing the library with `--repo <dir>`, or set BINDERY_HOME";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    /// ANSI bold plus the severity's color.
    fn ansi(self) -> &'static str {
        match self {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
        }
    }
}

const HELP_ANSI: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// A failure report: a headline, detail lines and suggested fixes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Detail lines such as compiler output or searched directories.
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
    /// File the failure is about.
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    pub fn with_context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |ansi: &str, text: &str| {
            if color {
                format!("{}{}{}", ansi, text, RESET)
            } else {
                text.to_string()
            }
        };

        let mut out = format!(
            "{}: {}\n",
            paint(self.severity.ansi(), self.severity.label()),
            self.message
        );
        if let Some(path) = &self.location {
            out.push_str(&format!("  --> {}\n", path.display()));
        }
        for line in &self.context {
            out.push_str(&format!("  | {}\n", line));
        }
        for suggestion in &self.suggestions {
            out.push_str(&format!("  = {}: {}\n", paint(HELP_ANSI, "help"), suggestion));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("`clang` failed with exit code Some(1)")
            .with_context("stubs.c:3:10: fatal error: 'foo.h' file not found")
            .with_location("/work/foo.def")
            .with_suggestion(suggestions::VERBOSE_COMMANDS);

        assert_eq!(
            diag.format(false),
            "error: `clang` failed with exit code Some(1)\n\
             \x20 --> /work/foo.def\n\
             \x20 | stubs.c:3:10: fatal error: 'foo.h' file not found\n\
             \x20 = help: Re-run with `--verbose` to see the exact compiler and linker commands\n"
        );
    }

    #[test]
    fn test_warning_without_suggestions() {
        let output = Diagnostic::warning("superseded manifest property").format(false);
        assert_eq!(output, "warning: superseded manifest property\n");
    }

    #[test]
    fn test_colored_label() {
        let output = Diagnostic::error("boom").format(true);
        assert!(output.starts_with("\x1b[1;31merror\x1b[0m: boom"));
    }
}
