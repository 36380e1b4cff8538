//! Resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during library resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not find library `{library}`")]
    LibraryNotFound {
        library: String,
        searched: Vec<PathBuf>,
    },

    #[error("cycle detected in library dependencies")]
    CycleDetected { libraries: Vec<String> },

    #[error("invalid library at {}: {message}", path.display())]
    InvalidLibrary { path: PathBuf, message: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::LibraryNotFound { library, searched } => {
                let mut diag =
                    Diagnostic::error(format!("could not find library `{}`", library));

                for dir in searched {
                    diag = diag.with_context(format!("searched {}", dir.display()));
                }

                diag.with_suggestion("Check that the library name is spelled correctly")
                    .with_suggestion(suggestions::LIBRARY_NOT_FOUND)
            }

            ResolveError::CycleDetected { libraries } => {
                Diagnostic::error("cycle detected in library dependencies")
                    .with_context(format!("cycle: {}", libraries.join(" -> ")))
                    .with_suggestion(
                        "Break the cycle by removing a `depends` entry from one manifest",
                    )
            }

            ResolveError::InvalidLibrary { path, message } => {
                Diagnostic::error(format!("invalid library: {}", message)).with_location(path)
            }
        }
    }
}
