//! Packaging of metadata-mode interop libraries.
//!
//! ```text
//! manifest                           key=value properties
//! linkdata/module                    serialized binding metadata
//! targets/<triple>/native/*.bc       bitcode linked into consumers
//! targets/<triple>/included/*        embedded static libraries
//! payloads                           sha256 of every other file
//! ```
//!
//! Packed libraries are gzipped tarballs with sorted entries, zero mtimes and
//! fixed modes, so identical inputs give identical bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::{Compression, GzBuilder};

use crate::core::artifact::PackagedLibrary;
use crate::core::error::{InteropError, Result};
use crate::core::manifest;
use crate::resolver::MANIFEST_FILE;
use crate::util::fs::{copy_file, ensure_dir, list_files_sorted, remove_if_exists, slash_path, write_bytes};
use crate::util::hash::digest_listing;

/// File listing payload digests.
pub const PAYLOADS_FILE: &str = "payloads";

/// Serialized metadata inside the library.
pub const MODULE_METADATA: &str = "linkdata/module";

/// Write the library to `output_path` and return where it went.
///
/// With `nopack` an unpacked directory is written instead of an archive.
/// Anything already at `output_path` is replaced.
pub fn create_interop_library(
    library: &PackagedLibrary,
    output_path: &Path,
    nopack: bool,
) -> Result<PathBuf> {
    remove_if_exists(output_path)?;

    if nopack {
        lay_out(library, output_path)?;
    } else {
        let staging = tempfile::Builder::new()
            .prefix("bindery-package-")
            .tempdir()
            .map_err(|e| InteropError::io(std::env::temp_dir(), e))?;
        lay_out(library, staging.path())?;
        pack(staging.path(), output_path)?;
    }

    tracing::info!("wrote interop library {}", output_path.display());
    Ok(output_path.to_path_buf())
}

fn lay_out(library: &PackagedLibrary, root: &Path) -> Result<()> {
    ensure_dir(root)?;

    let mut properties = library.manifest.clone();
    properties.insert(manifest::UNIQUE_NAME, library.module_name.clone());
    if let Some(short_name) = &library.short_name {
        properties.insert(manifest::SHORT_NAME, short_name.clone());
    }
    if let Some(version) = &library.library_version {
        properties.insert(manifest::LIBRARY_VERSION, version.clone());
    }
    properties.insert(manifest::DEPENDS, library.dependencies.join(" "));
    properties.insert(manifest::NATIVE_TARGETS, library.target.triple.clone());
    properties.store(&root.join(MANIFEST_FILE))?;

    let metadata = root.join(MODULE_METADATA);
    write_bytes(&metadata, &library.metadata).map_err(|e| InteropError::io(&metadata, e))?;

    let target_dir = root.join("targets").join(&library.target.triple);
    copy_into(&library.native_bitcode_files, &target_dir.join("native"))?;
    copy_into(&library.static_libraries, &target_dir.join("included"))?;

    let payloads = root.join(PAYLOADS_FILE);
    let listing = digest_listing(root, &[PAYLOADS_FILE])?;
    write_bytes(&payloads, listing.as_bytes()).map_err(|e| InteropError::io(&payloads, e))?;
    Ok(())
}

fn copy_into(files: &[PathBuf], dir: &Path) -> Result<()> {
    for file in files {
        let Some(name) = file.file_name() else {
            return Err(InteropError::MissingInput(file.clone()));
        };
        if !file.is_file() {
            return Err(InteropError::MissingInput(file.clone()));
        }
        copy_file(file, &dir.join(name))?;
    }
    Ok(())
}

fn pack(root: &Path, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(output_path).map_err(|e| InteropError::io(output_path, e))?;
    let encoder = GzBuilder::new()
        .mtime(0)
        .write(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let io_err = |e| InteropError::io(output_path, e);

    for relative in list_files_sorted(root)? {
        let source = root.join(&relative);
        let data = std::fs::read(&source).map_err(|e| InteropError::io(&source, e))?;

        let mut header = tar::Header::new_gnu();
        header.set_path(slash_path(&relative)).map_err(io_err)?;
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_cksum();
        builder.append(&header, data.as_slice()).map_err(io_err)?;
    }

    let encoder = builder.into_inner().map_err(io_err)?;
    let mut writer = encoder.finish().map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::ManifestProperties;
    use crate::core::target::TargetTriple;
    use crate::resolver::read_library;
    use tempfile::TempDir;

    fn library(tmp: &TempDir) -> PackagedLibrary {
        let bc = tmp.path().join("foostubs.bc");
        std::fs::write(&bc, "bitcode").unwrap();
        let mut manifest = ManifestProperties::new();
        manifest.insert("includedHeaders", "foo.h");
        manifest.insert("interop", "true");
        manifest.insert("package", "org.foo");

        PackagedLibrary {
            metadata: b"metadata".to_vec(),
            native_bitcode_files: vec![bc],
            static_libraries: vec![],
            target: TargetTriple::new("x86_64-unknown-linux-gnu"),
            module_name: "foo".to_string(),
            short_name: Some("f".to_string()),
            library_version: None,
            dependencies: vec!["stdlib".to_string(), "posix".to_string()],
            manifest,
        }
    }

    #[test]
    fn test_unpacked_layout() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out/foo");

        let path = create_interop_library(&library(&tmp), &out, true).unwrap();

        assert_eq!(path, out);
        assert_eq!(std::fs::read(out.join(MODULE_METADATA)).unwrap(), b"metadata");
        assert!(out
            .join("targets/x86_64-unknown-linux-gnu/native/foostubs.bc")
            .is_file());
        let manifest = ManifestProperties::load(&out.join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.get(manifest::UNIQUE_NAME), Some("foo"));
        assert_eq!(manifest.get(manifest::SHORT_NAME), Some("f"));
        assert_eq!(manifest.get_list(manifest::DEPENDS), vec!["stdlib", "posix"]);

        let payloads = std::fs::read_to_string(out.join(PAYLOADS_FILE)).unwrap();
        assert!(payloads.contains("  linkdata/module\n"));
        assert!(payloads.contains("  manifest\n"));
        assert!(!payloads.contains(PAYLOADS_FILE));
    }

    #[test]
    fn test_packed_library_is_readable_and_deterministic() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a/foo.bindlib");
        let second = tmp.path().join("b/foo.bindlib");

        create_interop_library(&library(&tmp), &first, false).unwrap();
        create_interop_library(&library(&tmp), &second, false).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        let read = read_library(&first, "foo").unwrap().unwrap();
        assert_eq!(read.unique_name, "foo");
        assert!(read.is_interop());
    }

    #[test]
    fn test_missing_bitcode_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut library = library(&tmp);
        library.native_bitcode_files.push(tmp.path().join("gone.bc"));

        let err = create_interop_library(&library, &tmp.path().join("out"), true).unwrap_err();
        assert!(matches!(err, InteropError::MissingInput(_)));
    }
}
