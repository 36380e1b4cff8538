//! Library dependency resolution.
//!
//! Requested libraries are looked up in the configured repositories and the
//! distribution, their `depends` entries are followed transitively, and the
//! closure is returned in topological order. Resolution is pure with respect
//! to the pipeline: it only reads library manifests.

pub mod errors;
pub mod imports;
pub mod resolve;

pub use errors::ResolveError;
pub use imports::Imports;
pub use resolve::ResolvedLibraries;

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::core::library::{LibraryReference, ResolvedLibrary};
use crate::core::manifest::ManifestProperties;
use crate::core::target::{TargetTriple, LIBRARY_SUFFIX};

/// Name of the manifest file inside a library.
pub const MANIFEST_FILE: &str = "manifest";

/// Name of the standard library in the distribution.
pub const STDLIB: &str = "stdlib";

/// Layout of the toolchain distribution's bundled libraries.
///
/// ```text
/// <home>/lib/common/stdlib            standard library
/// <home>/lib/common/<name>            endorsed libraries
/// <home>/lib/platform/<triple>/<name> default platform libraries
/// ```
#[derive(Debug, Clone)]
pub struct Distribution {
    pub home: PathBuf,
}

impl Distribution {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Distribution { home: home.into() }
    }

    pub fn common_dir(&self) -> PathBuf {
        self.home.join("lib").join("common")
    }

    pub fn platform_dir(&self, target: &TargetTriple) -> PathBuf {
        self.home.join("lib").join("platform").join(&target.triple)
    }
}

/// Which implicit libraries to leave out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveFlags {
    pub no_std_lib: bool,
    pub no_default_libs: bool,
    pub no_endorsed_libs: bool,
}

/// Resolves library references against repositories and the distribution.
#[derive(Debug, Clone)]
pub struct LibraryResolver {
    repos: Vec<PathBuf>,
    distribution: Distribution,
    target: TargetTriple,
}

impl LibraryResolver {
    pub fn new(repos: Vec<PathBuf>, distribution: Distribution, target: TargetTriple) -> Self {
        LibraryResolver {
            repos,
            distribution,
            target,
        }
    }

    /// Directories searched for a library name, in order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.repos.clone();
        dirs.push(self.distribution.common_dir());
        dirs.push(self.distribution.platform_dir(&self.target));
        dirs
    }

    /// Resolve the requested libraries and everything they depend on.
    ///
    /// The result lists every library after all of its dependencies.
    pub fn resolve_with_dependencies(
        &self,
        requested: &[LibraryReference],
        flags: ResolveFlags,
    ) -> Result<ResolvedLibraries, ResolveError> {
        let mut roots = Vec::new();

        if !flags.no_std_lib {
            match self.find(&LibraryReference::new(STDLIB)) {
                Ok(stdlib) => roots.push(stdlib),
                Err(ResolveError::LibraryNotFound { .. }) => {
                    tracing::debug!("no standard library in {}", self.distribution.home.display());
                }
                Err(e) => return Err(e),
            }
        }
        if !flags.no_endorsed_libs {
            roots.extend(self.libraries_in(&self.distribution.common_dir(), Some(STDLIB))?);
        }
        if !flags.no_default_libs {
            roots.extend(self.libraries_in(&self.distribution.platform_dir(&self.target), None)?);
        }
        for reference in requested {
            roots.push(self.find(reference)?);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut closure = Vec::new();
        let mut queue: VecDeque<ResolvedLibrary> = roots.into();

        while let Some(library) = queue.pop_front() {
            if !seen.insert(library.unique_name.clone()) {
                continue;
            }
            for dep in &library.depends {
                if !seen.contains(dep) {
                    queue.push_back(self.find(&LibraryReference::new(dep.clone()))?);
                }
            }
            tracing::debug!("resolved library `{}` at {}", library.unique_name, library.location.display());
            closure.push(library);
        }

        ResolvedLibraries::order(closure)
    }

    /// Locate and read a single library.
    pub fn find(&self, reference: &LibraryReference) -> Result<ResolvedLibrary, ResolveError> {
        if let Some(path) = reference.path() {
            for candidate in candidates_for(path) {
                if let Some(library) = read_library(&candidate, reference.name())? {
                    return Ok(library);
                }
            }
            return Err(ResolveError::LibraryNotFound {
                library: reference.handle().to_string(),
                searched: vec![path.to_path_buf()],
            });
        }

        let searched = self.search_dirs();
        for dir in &searched {
            for candidate in candidates_for(&dir.join(reference.name())) {
                if let Some(library) = read_library(&candidate, reference.name())? {
                    return Ok(library);
                }
            }
        }

        // `depends` records unique names, which need not match the file name.
        for dir in &searched {
            if let Some(library) = self.find_by_unique_name(dir, reference.name()) {
                return Ok(library);
            }
        }

        Err(ResolveError::LibraryNotFound {
            library: reference.handle().to_string(),
            searched,
        })
    }

    /// The first library in `dir`, by file name, whose manifest declares
    /// `unique_name`. Unreadable candidates are skipped.
    fn find_by_unique_name(&self, dir: &Path, unique_name: &str) -> Option<ResolvedLibrary> {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        paths.into_iter().find_map(|path| {
            match read_library(&path, &library_name(&path)) {
                Ok(Some(library)) if library.unique_name == unique_name => {
                    tracing::debug!("found `{}` by unique name at {}", unique_name, path.display());
                    Some(library)
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!("skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
    }

    /// Every library directly inside `dir`, sorted by file name.
    fn libraries_in(
        &self,
        dir: &Path,
        skip: Option<&str>,
    ) -> Result<Vec<ResolvedLibrary>, ResolveError> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Ok(Vec::new());
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        let mut libraries = Vec::new();
        for path in paths {
            let name = library_name(&path);
            if Some(name.as_str()) == skip {
                continue;
            }
            if let Some(library) = read_library(&path, &name)? {
                libraries.push(library);
            }
        }
        Ok(libraries)
    }
}

fn candidates_for(path: &Path) -> Vec<PathBuf> {
    let mut with_suffix = path.as_os_str().to_os_string();
    with_suffix.push(LIBRARY_SUFFIX);
    vec![path.to_path_buf(), PathBuf::from(with_suffix)]
}

fn library_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .strip_suffix(LIBRARY_SUFFIX)
        .map(str::to_string)
        .unwrap_or(file_name)
}

/// Read a library from an unpacked directory or a packed archive.
///
/// Returns `Ok(None)` when nothing library-shaped exists at `path`.
pub fn read_library(path: &Path, name: &str) -> Result<Option<ResolvedLibrary>, ResolveError> {
    if path.is_dir() {
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Ok(None);
        }
        let manifest =
            ManifestProperties::load(&manifest_path).map_err(|e| ResolveError::InvalidLibrary {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        return Ok(Some(ResolvedLibrary::from_manifest(path, name, manifest)));
    }

    if path.is_file() {
        let manifest = read_packed_manifest(path).map_err(|e| ResolveError::InvalidLibrary {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        return match manifest {
            Some(manifest) => Ok(Some(ResolvedLibrary::from_manifest(path, name, manifest))),
            None => Err(ResolveError::InvalidLibrary {
                path: path.to_path_buf(),
                message: format!("archive has no `{}` entry", MANIFEST_FILE),
            }),
        };
    }

    Ok(None)
}

fn read_packed_manifest(path: &Path) -> std::io::Result<Option<ManifestProperties>> {
    let file = File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        if entry_path == Path::new(MANIFEST_FILE) || entry_path == Path::new("./manifest") {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            return Ok(Some(ManifestProperties::parse(&text)));
        }
    }

    Ok(None)
}
