//! Framework security policy synchronization
//!
//! Installs the policy fragments a framework package ships under
//! `<install-path>/meta/framework-policy/<category>/<subcategory>/` into the
//! shared, multi-tenant policy tree, and removes them again:
//!
//! ```text
//! <install-path>/meta/framework-policy/apparmor/templates/network
//!        |  install (copy + fsync)      ^  remove
//!        v                              |
//! <shared-root>/apparmor/templates/<package>_network
//! ```
//!
//! The `<package>_` prefix keeps two packages that ship identically named
//! fragments from colliding. Work is sequential and stops at the first
//! error; nothing is rolled back, so a failed run can leave a subset of
//! files applied.
//!
//! # Architecture
//!
//! ```text
//!         framework_op / PolicyDriver      (4 category x subcategory passes)
//!                     |
//!               SyncOperator               (one glob, one target dir)
//!                     |
//!                 resolver                 (glob + regular-file check)
//!                     |
//!            policy_fs::FileSystem
//! ```
//!
//! # Example
//!
//! ```no_run
//! use policy_core::{Operation, PolicyConfig, framework_op};
//! use std::path::Path;
//!
//! fn install() -> policy_core::Result<()> {
//!     let config = PolicyConfig::default();
//!     framework_op(Operation::Install, "hello-framework", Path::new("/apps/hello-framework/1.0"), &config)
//! }
//! ```

pub mod check;
pub mod config;
pub mod driver;
pub mod error;
pub mod layout;
pub mod logging;
pub mod operation;
pub mod operator;
pub mod resolver;

pub use check::{CheckReport, CheckStatus, DriftItem};
pub use config::PolicyConfig;
pub use driver::{PolicyDriver, framework_op, validate_package_name};
pub use error::{Error, Result};
pub use layout::{POLICY_KINDS, PolicyCategory, PolicyKind, PolicySubcategory};
pub use operation::Operation;
pub use operator::SyncOperator;
