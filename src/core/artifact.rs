//! Outputs of compilation and packaging.

use std::path::{Path, PathBuf};

use crate::core::manifest::ManifestProperties;
use crate::core::target::TargetTriple;

/// What a compilation step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Object,
    Bitcode,
    SharedObject,
}

/// A file produced by the native compiler or linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl CompilationArtifact {
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        CompilationArtifact {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Everything that goes into a packaged interop library.
#[derive(Debug, Clone)]
pub struct PackagedLibrary {
    /// Serialized binding metadata from the stub emitter.
    pub metadata: Vec<u8>,
    /// Bitcode files linked into consumers.
    pub native_bitcode_files: Vec<PathBuf>,
    /// Static libraries embedded next to the bitcode.
    pub static_libraries: Vec<PathBuf>,
    pub target: TargetTriple,
    pub module_name: String,
    pub short_name: Option<String>,
    pub library_version: Option<String>,
    /// Unique names of the libraries this one depends on, in order.
    pub dependencies: Vec<String>,
    pub manifest: ManifestProperties,
}
