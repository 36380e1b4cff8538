//! On-disk fixtures: dependency libraries and definition files.

use std::path::{Path, PathBuf};

use crate::resolver::MANIFEST_FILE;

/// An unpacked interop library to place in a repository.
#[derive(Debug, Clone)]
pub struct LibraryFixture {
    pub name: String,
    pub package: Option<String>,
    pub headers: Vec<String>,
    pub depends: Vec<String>,
}

impl LibraryFixture {
    /// A library without bindings.
    pub fn new(name: impl Into<String>) -> Self {
        LibraryFixture {
            name: name.into(),
            package: None,
            headers: Vec::new(),
            depends: Vec::new(),
        }
    }

    /// A library binding `headers` under `package`.
    pub fn interop(name: impl Into<String>, package: &str, headers: &[&str]) -> Self {
        LibraryFixture {
            package: Some(package.to_string()),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            ..LibraryFixture::new(name)
        }
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.depends.push(name.to_string());
        self
    }

    /// Write `<dir>/<name>/manifest` and return the library directory.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let lib = dir.join(&self.name);
        std::fs::create_dir_all(&lib).unwrap();

        let mut manifest = format!("unique_name={}\n", self.name);
        if let Some(package) = &self.package {
            manifest.push_str(&format!("package={}\ninterop=true\n", package));
        }
        if !self.headers.is_empty() {
            manifest.push_str(&format!("includedHeaders={}\n", self.headers.join(" ")));
        }
        if !self.depends.is_empty() {
            manifest.push_str(&format!("depends={}\n", self.depends.join(" ")));
        }
        std::fs::write(lib.join(MANIFEST_FILE), manifest).unwrap();
        lib
    }
}

/// Write a definition file and return its path.
pub fn write_def(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
