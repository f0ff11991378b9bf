//! Filesystem primitives for framework policy synchronization
//!
//! Provides the [`FileSystem`] seam the policy sync operator runs against,
//! format-agnostic config loading and content checksums.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::{DEFAULT_DIR_MODE, FileKind, FileSystem, OsFileSystem, SourceFile, TargetFile};
