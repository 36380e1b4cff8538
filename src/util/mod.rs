//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;
pub mod temp;

pub use config::ToolConfig;
pub use diagnostic::Diagnostic;
pub use process::{ProcessBuilder, ProcessOutput};
pub use temp::TempFiles;
