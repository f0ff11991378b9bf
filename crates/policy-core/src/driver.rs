//! Package-level policy operations across every policy kind.

use std::io::ErrorKind;
use std::path::Path;

use policy_fs::{FileSystem, OsFileSystem, checksum};
use tracing::{info, warn};

use crate::layout::{package_prefix, target_file_name};
use crate::{
    CheckReport, DriftItem, Error, Operation, POLICY_KINDS, PolicyConfig, Result, SyncOperator,
    resolver,
};

/// Runs an operation for one package over all four policy kinds.
///
/// Kinds are processed in [`POLICY_KINDS`] order and the first failing kind
/// ends the run. Kinds processed before it keep their changes, so after an
/// error the package's policy may be partially installed or partially
/// removed. Callers must serialize runs against the same shared root; no
/// locking happens here.
#[derive(Debug, Clone)]
pub struct PolicyDriver<F = OsFileSystem> {
    config: PolicyConfig,
    operator: SyncOperator<F>,
}

impl PolicyDriver<OsFileSystem> {
    pub fn new(config: PolicyConfig) -> Self {
        Self::with_fs(config, OsFileSystem)
    }
}

impl<F: FileSystem> PolicyDriver<F> {
    pub fn with_fs(config: PolicyConfig, fs: F) -> Self {
        let operator = SyncOperator::new(fs).with_dir_mode(config.dir_mode);
        Self { config, operator }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn fs(&self) -> &F {
        self.operator.fs()
    }

    /// Install or remove the policy files of `package_name`, installed at
    /// `install_path`.
    ///
    /// Each kind's `<install_path>/meta/framework-policy/<category>/<subcategory>/*`
    /// maps onto `<shared_root>/<category>/<subcategory>/<package_name>_<basename>`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPackageName`] before anything is touched, otherwise
    /// the first error any kind reports.
    pub fn run(&self, operation: Operation, package_name: &str, install_path: &Path) -> Result<()> {
        validate_package_name(package_name)?;
        let prefix = package_prefix(package_name);

        let mut total = 0;
        for kind in POLICY_KINDS {
            let pattern = kind.source_glob(install_path, operation)?;
            let target_dir = kind.target_dir(&self.config.shared_root);

            let count = self
                .operator
                .apply(operation, &pattern, &target_dir, &prefix)
                .inspect_err(|e| {
                    warn!(
                        %operation,
                        package = package_name,
                        %kind,
                        error = %e,
                        "policy operation aborted; earlier files stay applied"
                    );
                })?;
            total += count;
        }

        info!(%operation, package = package_name, files = total, "policy operation complete");
        Ok(())
    }

    /// Like [`run`](Self::run), with the operation given as an external tag.
    ///
    /// The tag is parsed before anything else, so an unknown tag fails with
    /// [`Error::UnknownOperation`] without touching the filesystem.
    pub fn run_tagged(&self, tag: &str, package_name: &str, install_path: &Path) -> Result<()> {
        let operation: Operation = tag.parse()?;
        self.run(operation, package_name, install_path)
    }

    /// Compare every policy file the package ships with its installed copy.
    ///
    /// Read-only, and every read goes through the driver's [`FileSystem`].
    /// Sources are resolved and validated the same way Install resolves
    /// them, so a non-regular source fails the check.
    pub fn check(&self, package_name: &str, install_path: &Path) -> Result<CheckReport> {
        validate_package_name(package_name)?;
        let prefix = package_prefix(package_name);
        let fs = self.operator.fs();

        let mut report = CheckReport::healthy();
        for kind in POLICY_KINDS {
            let pattern = kind.source_glob(install_path, Operation::Install)?;
            let target_dir = kind.target_dir(&self.config.shared_root);

            for source in resolver::resolve(fs, &pattern, Operation::Install)? {
                let target = target_dir.join(target_file_name(&prefix, &source));
                let item = |description: &str| DriftItem {
                    kind,
                    source: source.clone(),
                    target: target.clone(),
                    description: description.to_string(),
                };

                let found = match fs.file_kind(&target) {
                    Ok(found) => found,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        report = report.merge(CheckReport::with_missing(vec![item("not installed")]));
                        continue;
                    }
                    Err(e) => {
                        return Err(Error::Stat {
                            operation: Operation::Install,
                            path: target.clone(),
                            source: e,
                        });
                    }
                };

                let entry = if !found.is_regular() {
                    CheckReport::with_drifted(vec![item("installed copy is not a regular file")])
                } else if checksum::compute_fs_checksum(fs, &source)?
                    != checksum::compute_fs_checksum(fs, &target)?
                {
                    CheckReport::with_drifted(vec![item("content differs from source")])
                } else {
                    CheckReport {
                        checked: 1,
                        ..CheckReport::healthy()
                    }
                };
                report = report.merge(entry);
            }
        }

        Ok(report)
    }
}

/// Install or remove a package's policy files on the host filesystem.
///
/// The single entry point package managers call.
pub fn framework_op(
    operation: Operation,
    package_name: &str,
    install_path: &Path,
    config: &PolicyConfig,
) -> Result<()> {
    PolicyDriver::new(config.clone()).run(operation, package_name, install_path)
}

/// Reject package names that cannot safely prefix a file name.
pub fn validate_package_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name == "." || name == ".." {
        "must not be a relative path component"
    } else if name.contains(['/', '\\', '\0']) {
        "must not contain path separators or NUL"
    } else {
        return Ok(());
    };

    Err(Error::InvalidPackageName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
