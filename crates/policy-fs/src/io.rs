//! Blocking filesystem primitives behind a swappable seam
//!
//! The sync operator never touches `std::fs` directly. It goes through
//! [`FileSystem`], so tests can observe the call sequence (for example that
//! a target was synced before it was closed) and inject failures.
//!
//! Nothing here retries, locks or times out.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::trace;

use crate::{Error, Result};

/// Mode for directories created under the shared policy root:
/// owner read/write/traverse, group and other read/traverse.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Classification of a path as seen by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    /// Fifo, socket, block or character device.
    Other,
}

impl FileKind {
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::Regular
        } else {
            Self::Other
        }
    }

    pub fn is_regular(self) -> bool {
        self == Self::Regular
    }
}

/// A source handle opened for reading.
pub trait SourceFile: Read {
    /// Release the handle, reporting any error the release produced.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// A target handle opened for writing.
pub trait TargetFile: Write {
    /// Force written data and metadata to durable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Release the handle, reporting any error the release produced.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// The filesystem operations policy synchronization is built from.
pub trait FileSystem {
    /// Create `path` and every missing ancestor with the given mode.
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Classify `path` without following a final symlink.
    fn file_kind(&self, path: &Path) -> io::Result<FileKind>;

    /// Open `path` for reading.
    fn open_source(&self, path: &Path) -> io::Result<Box<dyn SourceFile>>;

    /// Create or truncate `path` for writing.
    fn create_target(&self, path: &Path) -> io::Result<Box<dyn TargetFile>>;

    /// Delete the file at `path`. A missing file is an error.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        (**self).create_dir_all(path, mode)
    }

    fn file_kind(&self, path: &Path) -> io::Result<FileKind> {
        (**self).file_kind(path)
    }

    fn open_source(&self, path: &Path) -> io::Result<Box<dyn SourceFile>> {
        (**self).open_source(path)
    }

    fn create_target(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        (**self).create_target(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }
}

/// [`FileSystem`] backed by the host operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        trace!(path = %path.display(), mode, "create_dir_all");
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(path)
    }

    fn file_kind(&self, path: &Path) -> io::Result<FileKind> {
        trace!(path = %path.display(), "lstat");
        let metadata = fs::symlink_metadata(path)?;
        Ok(FileKind::from_file_type(metadata.file_type()))
    }

    fn open_source(&self, path: &Path) -> io::Result<Box<dyn SourceFile>> {
        trace!(path = %path.display(), "open source");
        Ok(Box::new(File::open(path)?))
    }

    fn create_target(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        trace!(path = %path.display(), "create target");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(file))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        trace!(path = %path.display(), "remove");
        fs::remove_file(path)
    }
}

impl SourceFile for File {
    // std reports no error on close; dropping is the release.
    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

impl TargetFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    // Deferred write failures surface through `sync_all`, which always
    // runs before a target is closed.
    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

/// Write content to a file by way of a synced temporary sibling and a rename.
///
/// Readers of `path` observe either the old content or the new, never a
/// partial write.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })?;

    trace!(path = %path.display(), bytes = content.len(), "wrote file atomically");
    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
