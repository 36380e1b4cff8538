//! Library references and resolved libraries.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::manifest::{self, ManifestProperties};

/// A request for a library, as the caller wrote it.
///
/// Equality is by handle: `posix` and `./libs/posix` are different
/// references even when they resolve to the same library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryReference {
    handle: String,
}

impl LibraryReference {
    pub fn new(handle: impl Into<String>) -> Self {
        LibraryReference {
            handle: handle.into(),
        }
    }

    /// The string used to request the library.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Library name without directories or suffix.
    pub fn name(&self) -> &str {
        let base = self
            .handle
            .rsplit(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
            .next()
            .unwrap_or(&self.handle);
        base.strip_suffix(crate::core::target::LIBRARY_SUFFIX)
            .unwrap_or(base)
    }

    /// Disambiguating path, when the handle names a location.
    pub fn path(&self) -> Option<&Path> {
        if self.handle.contains('/') || self.handle.contains(std::path::MAIN_SEPARATOR) {
            Some(Path::new(&self.handle))
        } else {
            None
        }
    }
}

impl fmt::Display for LibraryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handle)
    }
}

/// Identifier of a header as recorded in library manifests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderId(pub String);

impl HeaderId {
    pub fn new(value: impl Into<String>) -> Self {
        HeaderId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A library found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLibrary {
    /// Directory or packed archive the library was read from.
    pub location: PathBuf,
    /// Unique name, used to express dependencies.
    pub unique_name: String,
    /// Package identity of the bindings, when the library is an interop library.
    pub package: Option<String>,
    /// Headers whose declarations this library already binds.
    pub included_headers: Vec<HeaderId>,
    /// Unique names of the libraries this one depends on.
    pub depends: Vec<String>,
    /// Raw manifest.
    pub manifest: ManifestProperties,
}

impl ResolvedLibrary {
    /// Build from a library manifest.
    ///
    /// `fallback_name` is used when the manifest has no `unique_name`.
    pub fn from_manifest(
        location: impl Into<PathBuf>,
        fallback_name: &str,
        manifest: ManifestProperties,
    ) -> Self {
        let unique_name = manifest
            .get(manifest::UNIQUE_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| fallback_name.to_string());
        let package = manifest.get(manifest::PACKAGE).map(str::to_string);
        let included_headers = manifest
            .get_list(manifest::INCLUDED_HEADERS)
            .into_iter()
            .map(HeaderId)
            .collect();
        let depends = manifest.get_list(manifest::DEPENDS);

        ResolvedLibrary {
            location: location.into(),
            unique_name,
            package,
            included_headers,
            depends,
            manifest,
        }
    }

    /// Whether this is an interop library.
    pub fn is_interop(&self) -> bool {
        self.manifest.get(manifest::INTEROP) == Some("true")
    }
}

/// The binding package that already provides a header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageInfo {
    pub package: String,
    /// Unique name of the owning library.
    pub library: String,
}
