//! Per-run temporary files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::error::{InteropError, Result};

enum Root {
    /// Removed when the scope drops.
    Owned(TempDir),
    /// Caller-supplied directory, kept after the run.
    Kept(PathBuf),
}

/// Temporary namespace owned by one pipeline run.
///
/// Every file created through [`TempFiles::create`] lives under a single
/// directory. An owned directory is deleted when the scope drops, on success
/// and error paths alike.
pub struct TempFiles {
    root: Root,
    prefix: String,
}

impl TempFiles {
    /// Create a scope for `prefix`, under `dir` when given.
    pub fn new(prefix: &str, dir: Option<&Path>) -> Result<Self> {
        let root = match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| InteropError::io(dir, e))?;
                Root::Kept(dir.to_path_buf())
            }
            None => {
                let tmp = tempfile::Builder::new()
                    .prefix(&format!("bindery-{}-", prefix))
                    .tempdir()
                    .map_err(|e| InteropError::io(std::env::temp_dir(), e))?;
                Root::Owned(tmp)
            }
        };
        Ok(TempFiles {
            root,
            prefix: prefix.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        match &self.root {
            Root::Owned(tmp) => tmp.path(),
            Root::Kept(path) => path,
        }
    }

    /// Path for a new temporary file named `<name><suffix>`.
    ///
    /// The file itself is not created.
    pub fn create(&self, name: &str, suffix: &str) -> PathBuf {
        self.dir().join(format!("{}{}", name, suffix))
    }

    /// Path for a file named after this scope's prefix.
    pub fn file(&self, suffix: &str) -> PathBuf {
        self.create(&self.prefix, suffix)
    }
}

impl std::fmt::Debug for TempFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempFiles")
            .field("dir", &self.dir())
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_scope_is_removed_on_drop() {
        let dir = {
            let temp = TempFiles::new("foostubs", None).unwrap();
            let c_file = temp.file(".c");
            std::fs::write(&c_file, "int x;").unwrap();
            assert_eq!(c_file.file_name().unwrap(), "foostubs.c");
            temp.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_caller_dir_is_kept() {
        let tmp = tempfile::TempDir::new().unwrap();
        let kept = tmp.path().join("interop-tmp");
        {
            let temp = TempFiles::new("foostubs", Some(&kept)).unwrap();
            std::fs::write(temp.create("foostubs", ".o"), "").unwrap();
        }
        assert!(kept.join("foostubs.o").exists());
    }
}
