//! The sync operator: apply one operation to every file one glob resolves to.

use std::io::{self, Write};
use std::path::Path;

use policy_fs::{DEFAULT_DIR_MODE, FileSystem, OsFileSystem, SourceFile, TargetFile};
use tracing::{debug, warn};

use crate::layout::target_file_name;
use crate::{Error, Operation, Result, resolver};

/// Copies or removes the files one glob matches, renamed into one directory.
///
/// Processing is sequential and stops at the first error. Files handled
/// before the failure stay handled.
#[derive(Debug, Clone)]
pub struct SyncOperator<F = OsFileSystem> {
    fs: F,
    dir_mode: u32,
}

impl Default for SyncOperator<OsFileSystem> {
    fn default() -> Self {
        Self::new(OsFileSystem)
    }
}

impl<F: FileSystem> SyncOperator<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            dir_mode: DEFAULT_DIR_MODE,
        }
    }

    /// Mode used when creating missing target directories.
    pub fn with_dir_mode(mut self, dir_mode: u32) -> Self {
        self.dir_mode = dir_mode;
        self
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Apply `operation` to every regular file matching `pattern`.
    ///
    /// `target_dir` is created first (with all missing ancestors), even for
    /// Remove and even when nothing matches. Each source `dir/name` maps to
    /// `target_dir/<name_prefix><name>`.
    ///
    /// Returns the number of files processed.
    ///
    /// # Errors
    ///
    /// Returns the first failure; see [`Error`] for the conditions. Remove
    /// of a target that does not exist is an error.
    pub fn apply(
        &self,
        operation: Operation,
        pattern: &str,
        target_dir: &Path,
        name_prefix: &str,
    ) -> Result<usize> {
        self.fs
            .create_dir_all(target_dir, self.dir_mode)
            .map_err(|source| Error::DirectoryCreate {
                operation,
                path: target_dir.to_path_buf(),
                source,
            })?;

        let sources = resolver::resolve(&self.fs, pattern, operation)?;

        for source in &sources {
            let target = target_dir.join(target_file_name(name_prefix, source));
            debug!(
                %operation,
                source = %source.display(),
                target = %target.display(),
                "applying policy file"
            );
            match operation {
                Operation::Install => self.install(source, &target)?,
                Operation::Remove => self.remove(&target)?,
            }
        }

        Ok(sources.len())
    }

    fn remove(&self, target: &Path) -> Result<()> {
        self.fs.remove_file(target).map_err(|source| Error::Remove {
            path: target.to_path_buf(),
            source,
        })
    }

    /// Copy `source` over `target` and sync it.
    ///
    /// Both handles are closed on every path. A close failure is reported
    /// only when nothing failed before it; the target closes first.
    fn install(&self, source: &Path, target: &Path) -> Result<()> {
        let mut input = self
            .fs
            .open_source(source)
            .map_err(|e| Error::SourceRead {
                path: source.to_path_buf(),
                source: e,
            })?;

        let mut output = match self.fs.create_target(target) {
            Ok(output) => output,
            Err(e) => {
                if let Err(close_err) = input.close() {
                    debug!(path = %source.display(), error = %close_err, "ignoring close failure");
                }
                return Err(Error::TargetCreate {
                    path: target.to_path_buf(),
                    source: e,
                });
            }
        };

        let copied = copy_durable(&mut *input, &mut *output, source, target);

        let target_closed = output.close().map_err(|e| Error::Close {
            path: target.to_path_buf(),
            source: e,
        });
        let source_closed = input.close().map_err(|e| Error::Close {
            path: source.to_path_buf(),
            source: e,
        });

        if copied.is_err() {
            for masked in [&target_closed, &source_closed]
                .into_iter()
                .filter_map(|r| r.as_ref().err())
            {
                warn!(error = %masked, "close failed after an earlier install failure");
            }
        }

        copied.and(target_closed).and(source_closed)
    }
}

/// Stream every byte of `input` into `output`, then force it to disk.
///
/// A failure mid-stream leaves a partially written target behind.
fn copy_durable(
    input: &mut dyn SourceFile,
    output: &mut dyn TargetFile,
    source: &Path,
    target: &Path,
) -> Result<()> {
    io::copy(input, &mut *output)
        .and_then(|_| output.flush())
        .map_err(|e| Error::Copy {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
            source: e,
        })?;

    output.sync().map_err(|e| Error::Sync {
        path: target.to_path_buf(),
        source: e,
    })
}
