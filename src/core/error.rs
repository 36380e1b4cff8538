//! Error types for the interop pipeline.
//!
//! Internal layers fail fast with [`InteropError`]. At the outer API boundary
//! every error is converted into a [`PrettyError`] so callers get one uniform
//! result shape instead of raw low-level failures.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::resolver::errors::ResolveError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Result alias used across the pipeline.
pub type Result<T, E = InteropError> = std::result::Result<T, E>;

/// Error raised while building an interop library.
#[derive(Debug, Error)]
pub enum InteropError {
    /// Invalid, missing or mutually exclusive options.
    #[error("{0}")]
    Config(String),

    /// A file the run needs does not exist.
    #[error("missing input: {}", .0.display())]
    MissingInput(PathBuf),

    /// A requested library could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The native compiler or linker exited unsuccessfully.
    #[error("`{command}` failed with exit code {code:?}")]
    Process {
        command: String,
        code: Option<i32>,
        output: Vec<String>,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("header indexing failed: {0:#}")]
    Indexer(anyhow::Error),

    #[error("stub generation failed: {0:#}")]
    Emitter(anyhow::Error),
}

impl InteropError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        InteropError::Config(message.into())
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InteropError::Io {
            path: path.into(),
            source,
        }
    }

    /// The coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InteropError::Config(_) | InteropError::MissingInput(_) => ErrorKind::Config,
            InteropError::Resolve(_) => ErrorKind::Resolution,
            InteropError::Process { .. } => ErrorKind::Process,
            InteropError::Io { .. } => ErrorKind::Io,
            InteropError::Indexer(_) | InteropError::Emitter(_) => ErrorKind::Collaborator,
        }
    }
}

/// Category of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Resolution,
    Process,
    Io,
    Collaborator,
}

/// User-facing error returned from the outer API.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{message}")]
#[diagnostic(code(bindery::interop))]
pub struct PrettyError {
    pub kind: ErrorKind,
    pub message: String,
    /// Detail lines: tool output, or the directories searched for a library.
    pub output: Vec<String>,
    #[help]
    pub help: Option<String>,
}

impl PrettyError {
    /// Wrap an internal error.
    ///
    /// With `full_chain` set the message carries every cause in the chain
    /// rather than the top-level description only.
    pub fn from_error(err: InteropError, full_chain: bool) -> Self {
        let kind = err.kind();
        let mut message = err.to_string();
        if full_chain {
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                message.push_str("\ncaused by: ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
        }
        let (output, help) = match err {
            InteropError::Process { output, .. } => {
                (output, Some(suggestions::VERBOSE_COMMANDS.to_string()))
            }
            InteropError::Resolve(e) => {
                let diag = e.to_diagnostic();
                let help = (!diag.suggestions.is_empty()).then(|| diag.suggestions.join("\n"));
                (diag.context, help)
            }
            _ => (Vec::new(), None),
        };

        PrettyError {
            kind,
            message,
            output,
            help,
        }
    }

    /// Render as a terminal diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.message.clone());
        for line in &self.output {
            diag = diag.with_context(line.clone());
        }
        if let Some(help) = &self.help {
            for line in help.lines() {
                diag = diag.with_suggestion(line);
            }
        }
        diag
    }
}
