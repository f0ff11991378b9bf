//! End-to-end tests for the package lifecycle
//!
//! These exercise the complete flow a package manager drives: config loading
//! -> install -> check -> remove, against a temporary shared root.

use assert_fs::prelude::*;
use policy_core::{CheckStatus, Operation, PolicyConfig, PolicyDriver, framework_op};
use policy_fs::checksum::compute_file_checksum;
use policy_test_utils::{TestPackage, TestRoot};
use predicates::prelude::*;
use std::fs;

/// Write a TOML config pointing at `root` and load it back the way a host would.
fn load_config(root: &TestRoot) -> (tempfile::TempDir, PolicyConfig) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.toml");
    fs::write(
        &path,
        format!("shared_root = {:?}\ndir_mode = 493\n", root.path().display().to_string()),
    )
    .unwrap();
    let config = PolicyConfig::load(&path).unwrap();
    (dir, config)
}

#[test]
fn package_lifecycle_from_config_file() {
    let _ = policy_core::logging::init();
    tracing::info!("starting package lifecycle test");

    let root = TestRoot::new();
    let (_config_dir, config) = load_config(&root);
    assert_eq!(config.shared_root, root.path());

    let pkg = TestPackage::new("hello-framework")
        .with_policy("apparmor", "policygroups", "network", "# network access\n")
        .with_policy("apparmor", "templates", "default", "#include <tunables/global>\n")
        .with_policy("seccomp", "policygroups", "network", "socket\nbind\n")
        .with_policy("seccomp", "templates", "default", "deny ptrace\n");

    framework_op(Operation::Install, pkg.name(), pkg.install_path(), &config).unwrap();

    let installed = assert_fs::fixture::ChildPath::new(
        root.target_dir("apparmor", "templates").join("hello-framework_default"),
    );
    installed.assert(predicate::path::is_file());
    installed.assert("#include <tunables/global>\n");
    assert_eq!(
        compute_file_checksum(installed.path()).unwrap(),
        compute_file_checksum(
            &pkg.policy_dir("apparmor", "templates").join("default")
        )
        .unwrap()
    );

    let driver = PolicyDriver::new(config.clone());
    assert_eq!(
        driver.check(pkg.name(), pkg.install_path()).unwrap().status,
        CheckStatus::Healthy
    );

    framework_op(Operation::Remove, pkg.name(), pkg.install_path(), &config).unwrap();
    installed.assert(predicate::path::missing());
    assert!(root.snapshot().is_empty());
}

#[test]
fn two_frameworks_share_the_root_independently() {
    let root = TestRoot::new();
    let (_config_dir, config) = load_config(&root);
    let docker = TestPackage::new("docker")
        .with_policy("apparmor", "policygroups", "client", "docker client\n");
    let lxd = TestPackage::new("lxd").with_policy("apparmor", "policygroups", "client", "lxd client\n");

    framework_op(Operation::Install, docker.name(), docker.install_path(), &config).unwrap();
    framework_op(Operation::Install, lxd.name(), lxd.install_path(), &config).unwrap();
    framework_op(Operation::Remove, docker.name(), docker.install_path(), &config).unwrap();

    assert_eq!(root.entries("apparmor", "policygroups"), ["lxd_client"]);
    assert_eq!(root.read("apparmor", "policygroups", "lxd_client"), b"lxd client\n");
}

#[test]
fn failed_install_is_visible_and_partial() {
    let root = TestRoot::new();
    let (_config_dir, config) = load_config(&root);
    let pkg = TestPackage::new("broken")
        .with_policy("apparmor", "policygroups", "network", "ok\n")
        .with_policy_subdir("seccomp", "policygroups", "not-a-file");

    let err = framework_op(Operation::Install, pkg.name(), pkg.install_path(), &config).unwrap_err();

    assert!(err.to_string().contains("not a regular file"), "{err}");
    // No rollback: the kinds processed before the failure remain
    root.assert_installed("apparmor", "policygroups", "broken_network");
    let check_err = PolicyDriver::new(config)
        .check("broken", pkg.install_path())
        .unwrap_err();
    assert!(check_err.to_string().contains("not-a-file"), "{check_err}");
}
