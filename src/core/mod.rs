//! Core data structures for bindery.
//!
//! This module contains the foundational types used throughout the pipeline:
//! - Definition files and the assembled build configuration
//! - Library references, resolved libraries and manifests
//! - Header filtering decisions
//! - Targets, flavors and generation modes

pub mod artifact;
pub mod config;
pub mod def_file;
pub mod error;
pub mod filter;
pub mod language;
pub mod library;
pub mod manifest;
pub mod target;

pub use artifact::{ArtifactKind, CompilationArtifact, PackagedLibrary};
pub use config::{BuildConfiguration, Compilation, IncludeInfo, NativeLibrary};
pub use def_file::DefFile;
pub use error::{InteropError, PrettyError, Result};
pub use filter::{HeaderFilter, HeaderFilterDecision};
pub use language::Language;
pub use library::{HeaderId, LibraryReference, PackageInfo, ResolvedLibrary};
pub use manifest::ManifestProperties;
pub use target::{Flavor, GenerationMode, TargetTriple};
