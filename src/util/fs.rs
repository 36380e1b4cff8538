//! Filesystem utilities.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::error::{InteropError, Result};
use crate::core::filter::{compile_globs, matches_any};

/// Resolve include/exclude globs against a set of roots.
///
/// Returns a map from path relative to its root to the root it was found
/// under. Directories are never included, and a file matching any exclude
/// glob is dropped even if an include glob matches it. When two roots hold
/// the same relative path the later-declared root wins. Missing roots are
/// skipped with a warning.
pub fn find_files_by_globs(
    roots: &[PathBuf],
    include_globs: &[String],
    exclude_globs: &[String],
) -> Result<BTreeMap<PathBuf, PathBuf>> {
    let include = compile_globs(include_globs)?;
    let exclude = compile_globs(exclude_globs)?;
    let mut relative_to_root = BTreeMap::new();

    // Reverse order, first claim kept: the last root wins.
    for root in roots.iter().rev() {
        if !root.exists() {
            tracing::warn!("{} doesn't exist", root.display());
            continue;
        }

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let name = slash_path(relative);
            if matches_any(&exclude, &name) || !matches_any(&include, &name) {
                continue;
            }
            relative_to_root
                .entry(relative.to_path_buf())
                .or_insert_with(|| root.clone());
        }
    }

    Ok(relative_to_root)
}

/// Render a relative path with `/` separators.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| InteropError::io(path, e))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> io::Result<()> {
    write_bytes(path, contents.as_bytes())
}

/// Write bytes to a file, creating parent directories if needed.
pub fn write_bytes(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Copy a file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).map_err(|e| InteropError::io(src, e))?;
    Ok(())
}

/// Remove a file or directory tree, if it exists.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    };
    result.map_err(|e| InteropError::io(path, e))
}

/// Make `path` absolute against `base` when it is relative.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Every file under `dir`, relative to it, sorted.
pub fn list_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            InteropError::io(path, io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_file() {
            files.push(relative_path(dir, entry.path()));
        }
    }
    files.sort();
    Ok(files)
}
