//! Error types for policy-core
//!
//! Every variant is terminal for the batch that produced it. Messages name
//! the operation and path involved so a failure can be diagnosed without
//! re-running.

use std::path::PathBuf;

use crate::Operation;

/// Result type for policy-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while installing or removing policy files
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source pattern is not a valid glob
    #[error("{operation}: unable to glob {pattern}: {source}")]
    Glob {
        operation: Operation,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A source directory cannot be expressed as a glob pattern
    #[error("{operation}: unable to glob {path}: path is not valid UTF-8")]
    NonUtf8Path { operation: Operation, path: PathBuf },

    /// Metadata could not be read for a matched path
    #[error("{operation}: unable to stat {path}: {source}")]
    Stat {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matched path is a directory, symlink, device or other non-file
    #[error("unable to do {operation} for {path}: not a regular file")]
    NotRegularFile { operation: Operation, path: PathBuf },

    /// The target directory tree could not be created
    #[error("{operation}: unable to make {path} directory: {source}")]
    DirectoryCreate {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file could not be opened for reading
    #[error("Install: unable to read {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target file could not be created or truncated
    #[error("Install: unable to create {path}: {source}")]
    TargetCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Streaming bytes from source to target failed part way
    #[error("Install: unable to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target could not be flushed to durable storage
    #[error("Install: when syncing {path}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Releasing a handle failed and nothing had failed before it
    #[error("Install: when closing {path}: {source}")]
    Close {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The installed target could not be deleted, including when it is absent
    #[error("Remove: unable to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation tag is neither Install nor Remove
    #[error("unknown operation {operation}")]
    UnknownOperation { operation: String },

    /// The package name cannot be used as a target file prefix
    #[error("invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: String },

    /// Filesystem error from policy-fs
    #[error(transparent)]
    Fs(#[from] policy_fs::Error),
}
