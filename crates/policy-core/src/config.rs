//! Policy synchronization configuration

use std::path::{Path, PathBuf};

use policy_fs::{ConfigStore, DEFAULT_DIR_MODE};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Root of the shared policy tree on a stock host.
pub const DEFAULT_SHARED_ROOT: &str = "/var/lib/snappy";

/// Where installed policy files live and how their directories are created.
///
/// Injected into [`PolicyDriver`](crate::PolicyDriver) rather than read from
/// process-wide state, so each caller (and each test) can point at its own
/// root. Missing fields take their defaults when loaded from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Parent of every `<category>/<subcategory>` target directory.
    pub shared_root: PathBuf,
    /// Permission bits for directories created under `shared_root`.
    pub dir_mode: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            shared_root: PathBuf::from(DEFAULT_SHARED_ROOT),
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl PolicyConfig {
    /// Default configuration rooted at `shared_root`.
    pub fn new(shared_root: impl Into<PathBuf>) -> Self {
        Self {
            shared_root: shared_root.into(),
            ..Self::default()
        }
    }

    /// Load from a `.toml`, `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Save to a `.toml`, `.json`, `.yaml` or `.yml` file.
    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }
}
