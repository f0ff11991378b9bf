//! SHA-256 checksum utilities
//!
//! One canonical format (`sha256:<hex>`) used to compare installed policy
//! files against the package copies they came from.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{Error, FileSystem, OsFileSystem, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of in-memory content.
pub fn compute_content_checksum(content: &[u8]) -> String {
    format!("{}{:x}", PREFIX, Sha256::digest(content))
}

/// Compute the SHA-256 checksum of a file's contents, streaming it from disk.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    compute_fs_checksum(&OsFileSystem, path)
}

/// Like [`compute_file_checksum`], reading through `fs`.
///
/// The handle is closed even when reading fails; a read error wins over a
/// close error.
pub fn compute_fs_checksum<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> Result<String> {
    let mut file = fs.open_source(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha256::new();
    let read = std::io::copy(&mut file, &mut hasher);
    let closed = file.close();
    read.and(closed).map_err(|e| Error::io(path, e))?;
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}
