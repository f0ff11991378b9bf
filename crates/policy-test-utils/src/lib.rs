//! Shared test fixtures for the framework-policy workspace.
//!
//! A dev-dependency only; never published.
//!
//! # Modules
//!
//! - [`package`]: [`TestPackage`] builder laying out a package's
//!   `meta/framework-policy` tree, and [`TestRoot`] for the shared policy root
//! - [`recording`]: [`RecordingFs`], a [`policy_fs::FileSystem`] that logs
//!   every call and can be told to fail specific ones

pub mod package;
pub mod recording;

pub use package::{TestPackage, TestRoot};
pub use recording::{Fault, FsEvent, RecordingFs};
