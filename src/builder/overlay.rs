//! Virtual include overlays.
//!
//! Headers found under additional search prefixes are exposed to clang
//! through a single synthetic include directory. The mapping from virtual to
//! real paths is written as a clang VFS overlay descriptor (JSON, which clang
//! reads as YAML).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::core::def_file::DefFile;
use crate::core::error::{InteropError, Result};
use crate::util::fs::{find_files_by_globs, write_string};
use crate::util::temp::TempFiles;

/// Name of the synthetic include directory under the system temp dir.
pub const VIRTUAL_ROOT_NAME: &str = "bindery-system-include";

/// The synthetic include directory.
pub fn virtual_root() -> PathBuf {
    std::env::temp_dir().join(VIRTUAL_ROOT_NAME)
}

/// Compiler flags exposing headers under `prefixes` that pass the
/// definition file's header filter.
///
/// Returns no flags when there are no prefixes or nothing matched.
pub fn overlay_compiler_flags(
    prefixes: &[PathBuf],
    def: &DefFile,
    temp: &TempFiles,
) -> Result<Vec<String>> {
    if prefixes.is_empty() {
        return Ok(Vec::new());
    }

    let header_filter = def.config.header_filter();
    if header_filter.is_empty() {
        return Err(InteropError::config(
            "'--header-filter-additional-search-prefix' requires 'headerFilter' to be specified in the .def file",
        ));
    }

    let relative_to_root =
        find_files_by_globs(prefixes, &header_filter, &def.config.exclude_filter())?;
    overlay_flags_for(&relative_to_root, &virtual_root(), &temp.create("vfsoverlay", ".yaml"))
}

/// Write the overlay descriptor for a resolved file set and return the flags.
pub fn overlay_flags_for(
    relative_to_root: &BTreeMap<PathBuf, PathBuf>,
    virtual_root: &Path,
    descriptor: &Path,
) -> Result<Vec<String>> {
    if relative_to_root.is_empty() {
        return Ok(Vec::new());
    }

    let virtual_to_real: BTreeMap<PathBuf, PathBuf> = relative_to_root
        .iter()
        .map(|(relative, root)| (virtual_root.join(relative), root.join(relative)))
        .collect();

    let content = serde_json::to_string_pretty(&overlay_descriptor(virtual_root, &virtual_to_real))
        .map_err(|e| InteropError::config(format!("failed to serialize VFS overlay: {}", e)))?;
    write_string(descriptor, &content).map_err(|e| InteropError::io(descriptor, e))?;
    tracing::debug!(
        "wrote VFS overlay with {} entries to {}",
        virtual_to_real.len(),
        descriptor.display()
    );

    Ok(vec![
        format!("-I{}", virtual_root.display()),
        "-ivfsoverlay".to_string(),
        descriptor.display().to_string(),
    ])
}

#[derive(Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeMap<String, PathBuf>,
}

impl DirNode {
    fn insert(&mut self, components: &[String], real: &Path) {
        match components {
            [] => {}
            [file] => {
                self.files.insert(file.clone(), real.to_path_buf());
            }
            [dir, rest @ ..] => self.dirs.entry(dir.clone()).or_default().insert(rest, real),
        }
    }

    fn contents(&self) -> Vec<Value> {
        let mut entries: Vec<Value> = self
            .dirs
            .iter()
            .map(|(name, node)| {
                json!({
                    "type": "directory",
                    "name": name,
                    "contents": node.contents(),
                })
            })
            .collect();
        entries.extend(self.files.iter().map(|(name, real)| {
            json!({
                "type": "file",
                "name": name,
                "external-contents": real.display().to_string(),
            })
        }));
        entries
    }
}

fn overlay_descriptor(virtual_root: &Path, virtual_to_real: &BTreeMap<PathBuf, PathBuf>) -> Value {
    let mut tree = DirNode::default();
    for (virtual_path, real) in virtual_to_real {
        let relative = virtual_path.strip_prefix(virtual_root).unwrap_or(virtual_path);
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        tree.insert(&components, real);
    }

    json!({
        "version": 0,
        "case-sensitive": "false",
        "roots": [{
            "type": "directory",
            "name": virtual_root.display().to_string(),
            "contents": tree.contents(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn def_with(text: &str) -> DefFile {
        DefFile::parse(text, &[])
    }

    #[test]
    fn test_no_prefixes_is_a_no_op() {
        let temp = TempFiles::new("test", None).unwrap();
        let flags = overlay_compiler_flags(&[], &def_with("headers = foo.h\n"), &temp).unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn test_prefixes_require_header_filter() {
        let temp = TempFiles::new("test", None).unwrap();
        let err = overlay_compiler_flags(
            &[PathBuf::from("/usr/include")],
            &def_with("headers = foo.h\n"),
            &temp,
        )
        .unwrap_err();
        match err {
            InteropError::Config(message) => assert!(message.contains("headerFilter")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_no_matches_yields_no_flags() {
        let tmp = TempDir::new().unwrap();
        let temp = TempFiles::new("test", None).unwrap();
        let flags = overlay_compiler_flags(
            &[tmp.path().to_path_buf()],
            &def_with("headerFilter = *.h\n"),
            &temp,
        )
        .unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn test_overlay_descriptor_and_flags() {
        let tmp = TempDir::new().unwrap();
        let prefix = tmp.path().join("prefix");
        fs::create_dir_all(prefix.join("sys")).unwrap();
        fs::write(prefix.join("foo.h"), "").unwrap();
        fs::write(prefix.join("sys/bar.h"), "").unwrap();
        fs::write(prefix.join("skip.h"), "").unwrap();
        let temp = TempFiles::new("test", None).unwrap();

        let flags = overlay_compiler_flags(
            &[prefix.clone()],
            &def_with("headerFilter = *.h sys/*.h\nexcludeFilter = skip.h\n"),
            &temp,
        )
        .unwrap();

        assert_eq!(flags.len(), 3);
        assert_eq!(flags[0], format!("-I{}", virtual_root().display()));
        assert_eq!(flags[1], "-ivfsoverlay");

        let descriptor: Value =
            serde_json::from_str(&fs::read_to_string(&flags[2]).unwrap()).unwrap();
        let root = &descriptor["roots"][0];
        assert_eq!(root["name"], virtual_root().display().to_string());

        let contents = root["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["name"], "sys");
        assert_eq!(
            contents[0]["contents"][0]["external-contents"],
            prefix.join("sys/bar.h").display().to_string()
        );
        assert_eq!(contents[1]["name"], "foo.h");
    }

    #[test]
    fn test_descriptor_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let mut set = BTreeMap::new();
        set.insert(PathBuf::from("b.h"), PathBuf::from("/real/one"));
        set.insert(PathBuf::from("a/c.h"), PathBuf::from("/real/two"));

        let first = tmp.path().join("first.yaml");
        let second = tmp.path().join("second.yaml");
        overlay_flags_for(&set, Path::new("/virtual"), &first).unwrap();
        overlay_flags_for(&set, Path::new("/virtual"), &second).unwrap();

        assert_eq!(
            fs::read_to_string(first).unwrap(),
            fs::read_to_string(second).unwrap()
        );
    }
}
