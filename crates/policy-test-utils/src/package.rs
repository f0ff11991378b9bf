//! Temporary package install trees and shared policy roots.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A package install directory with a `meta/framework-policy` tree.
///
/// # Example
///
/// ```rust,no_run
/// use policy_test_utils::TestPackage;
///
/// let pkg = TestPackage::new("hello-framework")
///     .with_policy("apparmor", "policygroups", "network", "# network access\n")
///     .with_policy("seccomp", "templates", "default", "deny ptrace\n");
/// assert!(pkg.policy_dir("apparmor", "policygroups").join("network").is_file());
/// ```
pub struct TestPackage {
    name: String,
    temp_dir: TempDir,
}

impl TestPackage {
    /// Create an empty install directory for `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn install_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `<install_path>/meta/framework-policy/<category>/<subcategory>`
    pub fn policy_dir(&self, category: &str, subcategory: &str) -> PathBuf {
        self.install_path()
            .join("meta")
            .join("framework-policy")
            .join(category)
            .join(subcategory)
    }

    /// Add a policy fragment file.
    pub fn with_policy(
        self,
        category: &str,
        subcategory: &str,
        file_name: &str,
        content: impl AsRef<[u8]>,
    ) -> Self {
        let dir = self.policy_dir(category, subcategory);
        fs::create_dir_all(&dir)
            .unwrap_or_else(|e| panic!("TestPackage: failed to create {}: {e}", dir.display()));
        fs::write(dir.join(file_name), content)
            .unwrap_or_else(|e| panic!("TestPackage: failed to write {file_name}: {e}"));
        self
    }

    /// Add a directory where a policy fragment would be expected.
    pub fn with_policy_subdir(self, category: &str, subcategory: &str, dir_name: &str) -> Self {
        let dir = self.policy_dir(category, subcategory).join(dir_name);
        fs::create_dir_all(&dir)
            .unwrap_or_else(|e| panic!("TestPackage: failed to create {}: {e}", dir.display()));
        self
    }

    /// Add a symlink named `link_name` pointing at `target`.
    #[cfg(unix)]
    pub fn with_policy_symlink(
        self,
        category: &str,
        subcategory: &str,
        link_name: &str,
        target: &Path,
    ) -> Self {
        let dir = self.policy_dir(category, subcategory);
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(target, dir.join(link_name))
            .unwrap_or_else(|e| panic!("TestPackage: failed to symlink {link_name}: {e}"));
        self
    }
}

/// A temporary shared policy root.
pub struct TestRoot {
    temp_dir: TempDir,
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRoot {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `<root>/<category>/<subcategory>`
    pub fn target_dir(&self, category: &str, subcategory: &str) -> PathBuf {
        self.path().join(category).join(subcategory)
    }

    /// Sorted file names in one target directory; empty if it does not exist.
    pub fn entries(&self, category: &str, subcategory: &str) -> Vec<String> {
        let dir = self.target_dir(category, subcategory);
        let Ok(read_dir) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = read_dir
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Every file under the root, keyed by root-relative path, with its bytes.
    ///
    /// Directories are not listed, so a tree whose directories were created
    /// but whose files were all removed snapshots as empty.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect_files(self.path(), self.path(), &mut files);
        files
    }

    /// Read an installed file.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read(&self, category: &str, subcategory: &str, file_name: &str) -> Vec<u8> {
        let path = self.target_dir(category, subcategory).join(file_name);
        fs::read(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Assert that an installed file exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if it does not.
    pub fn assert_installed(&self, category: &str, subcategory: &str, file_name: &str) {
        let path = self.target_dir(category, subcategory).join(file_name);
        assert!(path.is_file(), "Expected file to exist: {}", path.display());
    }

    /// Assert that an installed file does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if it does.
    pub fn assert_not_installed(&self, category: &str, subcategory: &str, file_name: &str) {
        let path = self.target_dir(category, subcategory).join(file_name);
        assert!(
            !path.exists(),
            "Expected file NOT to exist: {}",
            path.display()
        );
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            files.insert(relative, fs::read(&path).unwrap());
        }
    }
}
