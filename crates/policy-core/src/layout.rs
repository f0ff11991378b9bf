//! Where policy files come from and where they go.
//!
//! The set of policy kinds is fixed at compile time: two categories of
//! policy mechanism, each holding the same two kinds of artifact.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Operation, Result};

/// Directory under a package's install path that holds its policy fragments.
pub const META_DIR: &str = "meta";
/// Subdirectory of [`META_DIR`] holding one directory per category.
pub const FRAMEWORK_POLICY_DIR: &str = "framework-policy";

/// Top-level policy namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyCategory {
    AppArmor,
    Seccomp,
}

impl PolicyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppArmor => "apparmor",
            Self::Seccomp => "seccomp",
        }
    }
}

impl AsRef<Path> for PolicyCategory {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of policy artifact within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicySubcategory {
    PolicyGroups,
    Templates,
}

impl PolicySubcategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyGroups => "policygroups",
            Self::Templates => "templates",
        }
    }
}

impl AsRef<Path> for PolicySubcategory {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl fmt::Display for PolicySubcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (category, subcategory) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyKind {
    pub category: PolicyCategory,
    pub subcategory: PolicySubcategory,
}

/// Every policy kind, in the order the driver processes them.
pub const POLICY_KINDS: [PolicyKind; 4] = [
    PolicyKind::new(PolicyCategory::AppArmor, PolicySubcategory::PolicyGroups),
    PolicyKind::new(PolicyCategory::AppArmor, PolicySubcategory::Templates),
    PolicyKind::new(PolicyCategory::Seccomp, PolicySubcategory::PolicyGroups),
    PolicyKind::new(PolicyCategory::Seccomp, PolicySubcategory::Templates),
];

impl PolicyKind {
    pub const fn new(category: PolicyCategory, subcategory: PolicySubcategory) -> Self {
        Self {
            category,
            subcategory,
        }
    }

    /// `<install_path>/meta/framework-policy/<category>/<subcategory>`
    pub fn source_dir(&self, install_path: &Path) -> PathBuf {
        install_path
            .join(META_DIR)
            .join(FRAMEWORK_POLICY_DIR)
            .join(self.category)
            .join(self.subcategory)
    }

    /// Glob matching every entry of [`source_dir`](Self::source_dir).
    ///
    /// The directory part is escaped, so an install path containing glob
    /// metacharacters is matched literally.
    ///
    /// # Errors
    ///
    /// [`Error::NonUtf8Path`] if the source directory is not valid UTF-8.
    /// Glob patterns are strings, and a lossy conversion would match nothing.
    pub fn source_glob(&self, install_path: &Path, operation: Operation) -> Result<String> {
        let dir = self.source_dir(install_path);
        let Some(dir_str) = dir.to_str() else {
            return Err(Error::NonUtf8Path {
                operation,
                path: dir,
            });
        };
        let escaped = glob::Pattern::escape(dir_str);
        Ok(format!("{escaped}{}*", std::path::MAIN_SEPARATOR))
    }

    /// `<shared_root>/<category>/<subcategory>`
    pub fn target_dir(&self, shared_root: &Path) -> PathBuf {
        shared_root.join(self.category).join(self.subcategory)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.subcategory)
    }
}

/// Prefix namespacing a package's files in the shared tree: `<package>_`.
pub fn package_prefix(package_name: &str) -> String {
    format!("{package_name}_")
}

/// Target file name for a source: the prefix followed by the source's basename.
///
/// Install and Remove both derive target paths here, so they always agree.
pub fn target_file_name(name_prefix: &str, source: &Path) -> OsString {
    let mut name = OsString::from(name_prefix);
    name.push(source.file_name().unwrap_or_default());
    name
}
