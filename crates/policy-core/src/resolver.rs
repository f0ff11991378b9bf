//! File set resolution: expand a glob and insist every match is a plain file.

use std::path::PathBuf;

use policy_fs::FileSystem;
use tracing::trace;

use crate::{Error, Operation, Result};

/// Expand `pattern` into a sorted list of regular files.
///
/// An empty match set is not an error. Every match is classified with
/// `lstat`, so symlinks are rejected along with directories, fifos, sockets
/// and devices. `operation` only labels errors.
///
/// # Errors
///
/// - [`Error::Glob`] if `pattern` is malformed
/// - [`Error::Stat`] if a match (or a directory walked to reach it) cannot be read
/// - [`Error::NotRegularFile`] for the first match in sorted order that is not a plain file
pub fn resolve<F: FileSystem + ?Sized>(
    fs: &F,
    pattern: &str,
    operation: Operation,
) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|source| Error::Glob {
        operation,
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::Stat {
            operation,
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        paths.push(path);
    }
    paths.sort();

    for path in &paths {
        let kind = fs.file_kind(path).map_err(|source| Error::Stat {
            operation,
            path: path.clone(),
            source,
        })?;
        if !kind.is_regular() {
            return Err(Error::NotRegularFile {
                operation,
                path: path.clone(),
            });
        }
    }

    trace!(pattern, matches = paths.len(), "resolved policy files");
    Ok(paths)
}
