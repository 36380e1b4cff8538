//! Hashing utilities for payload digests.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::core::error::{InteropError, Result};
use crate::util::fs::{list_files_sorted, slash_path};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| InteropError::io(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| InteropError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// `<sha256>  <relative path>` lines for every file under `dir`, sorted by path.
///
/// Files named in `skip` (relative, `/`-separated) are left out.
pub fn digest_listing(dir: &Path, skip: &[&str]) -> Result<String> {
    let mut listing = String::new();
    for relative in list_files_sorted(dir)? {
        let name = slash_path(&relative);
        if skip.contains(&name.as_str()) {
            continue;
        }
        let digest = sha256_file(&dir.join(&relative))?;
        listing.push_str(&format!("{}  {}\n", digest, name));
    }
    Ok(listing)
}
