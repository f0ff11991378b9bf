//! Tests for package-level policy operations

use policy_core::{
    CheckStatus, Error, Operation, POLICY_KINDS, PolicyConfig, PolicyDriver, framework_op,
};
use policy_test_utils::{Fault, FsEvent, RecordingFs, TestPackage, TestRoot};
use pretty_assertions::assert_eq;
use std::fs;

fn driver(root: &TestRoot) -> PolicyDriver {
    PolicyDriver::new(PolicyConfig::new(root.path()))
}

fn full_package(name: &str) -> TestPackage {
    TestPackage::new(name)
        .with_policy("apparmor", "policygroups", "network", "# network\n")
        .with_policy("apparmor", "policygroups", "audio", "# audio\n")
        .with_policy("apparmor", "templates", "default", "profile default {}\n")
        .with_policy("seccomp", "policygroups", "network", "socket\nconnect\n")
        .with_policy("seccomp", "templates", "default", "deny ptrace\n")
}

#[test]
fn install_places_every_kind_under_the_shared_root() {
    let root = TestRoot::new();
    let pkg = full_package("fw");

    driver(&root)
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();

    assert_eq!(
        root.entries("apparmor", "policygroups"),
        ["fw_audio", "fw_network"]
    );
    assert_eq!(root.entries("apparmor", "templates"), ["fw_default"]);
    assert_eq!(root.entries("seccomp", "policygroups"), ["fw_network"]);
    assert_eq!(root.entries("seccomp", "templates"), ["fw_default"]);
    assert_eq!(
        root.read("seccomp", "policygroups", "fw_network"),
        b"socket\nconnect\n"
    );
}

#[test]
fn install_then_remove_restores_the_previous_tree() {
    let root = TestRoot::new();
    fs::create_dir_all(root.target_dir("apparmor", "templates")).unwrap();
    fs::write(
        root.target_dir("apparmor", "templates").join("other_default"),
        "belongs to another package",
    )
    .unwrap();
    let before = root.snapshot();
    let pkg = full_package("fw");
    let driver = driver(&root);

    driver
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();
    assert_ne!(root.snapshot(), before);

    driver
        .run(Operation::Remove, pkg.name(), pkg.install_path())
        .unwrap();
    assert_eq!(root.snapshot(), before);
}

#[test]
fn packages_shipping_the_same_file_do_not_collide() {
    let root = TestRoot::new();
    let a = TestPackage::new("alpha").with_policy("apparmor", "policygroups", "network", "alpha");
    let b = TestPackage::new("beta").with_policy("apparmor", "policygroups", "network", "beta");
    let driver = driver(&root);

    driver.run(Operation::Install, a.name(), a.install_path()).unwrap();
    driver.run(Operation::Install, b.name(), b.install_path()).unwrap();

    assert_eq!(
        root.entries("apparmor", "policygroups"),
        ["alpha_network", "beta_network"]
    );
    assert_eq!(root.read("apparmor", "policygroups", "alpha_network"), b"alpha");
    assert_eq!(root.read("apparmor", "policygroups", "beta_network"), b"beta");

    driver.run(Operation::Remove, a.name(), a.install_path()).unwrap();

    root.assert_not_installed("apparmor", "policygroups", "alpha_network");
    root.assert_installed("apparmor", "policygroups", "beta_network");
    assert_eq!(root.read("apparmor", "policygroups", "beta_network"), b"beta");
}

#[test]
fn removing_a_package_that_was_never_installed_fails() {
    let root = TestRoot::new();
    let pkg = full_package("fw");

    let err = driver(&root)
        .run(Operation::Remove, pkg.name(), pkg.install_path())
        .unwrap_err();

    match err {
        Error::Remove { path, .. } => {
            assert_eq!(path, root.target_dir("apparmor", "policygroups").join("fw_audio"));
        }
        other => panic!("expected Remove, got {other:?}"),
    }
}

#[test]
fn unknown_operation_tag_touches_nothing() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let recording = RecordingFs::new();
    let driver = PolicyDriver::with_fs(PolicyConfig::new(root.path()), &recording);

    let err = driver
        .run_tagged("upgrade", pkg.name(), pkg.install_path())
        .unwrap_err();

    assert!(
        matches!(err, Error::UnknownOperation { ref operation } if operation == "upgrade"),
        "got {err:?}"
    );
    assert!(recording.events().is_empty());
    assert!(root.snapshot().is_empty());
    assert!(fs::read_dir(root.path()).unwrap().next().is_none());
}

#[test]
fn known_operation_tags_dispatch() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let driver = driver(&root);

    driver
        .run_tagged("install", pkg.name(), pkg.install_path())
        .unwrap();
    root.assert_installed("seccomp", "templates", "fw_default");

    driver
        .run_tagged("Remove", pkg.name(), pkg.install_path())
        .unwrap();
    root.assert_not_installed("seccomp", "templates", "fw_default");
}

#[test]
fn first_failing_kind_stops_the_run() {
    let root = TestRoot::new();
    let pkg = TestPackage::new("fw")
        .with_policy("apparmor", "policygroups", "network", "x")
        .with_policy_subdir("apparmor", "templates", "nested")
        .with_policy("seccomp", "templates", "default", "y");

    let err = driver(&root)
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap_err();

    assert!(
        matches!(err, Error::NotRegularFile { operation: Operation::Install, ref path } if path.ends_with("nested")),
        "got {err:?}"
    );
    // Earlier kinds stay applied, later kinds are never attempted
    root.assert_installed("apparmor", "policygroups", "fw_network");
    root.assert_not_installed("apparmor", "templates", "fw_nested");
    assert!(!root.path().join("seccomp").exists());
}

#[test]
fn install_creates_all_target_directories_even_without_policy() {
    let root = TestRoot::new();
    let pkg = TestPackage::new("bare");

    driver(&root)
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();

    for kind in POLICY_KINDS {
        assert!(kind.target_dir(root.path()).is_dir(), "{kind}");
    }
    assert!(root.snapshot().is_empty());
}

#[test]
fn install_into_missing_root_creates_it() {
    let parent = TestRoot::new();
    let shared_root = parent.path().join("var").join("lib").join("policy");
    let pkg = full_package("fw");

    PolicyDriver::new(PolicyConfig::new(&shared_root))
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();

    assert!(shared_root.join("apparmor/templates/fw_default").is_file());
}

#[test]
fn every_installed_file_is_synced_before_success() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let recording = RecordingFs::new();

    PolicyDriver::with_fs(PolicyConfig::new(root.path()), &recording)
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();

    let events = recording.events();
    let created: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            FsEvent::CreateTarget(p) => Some(p.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 5);
    for target in created {
        let synced = events
            .iter()
            .position(|e| *e == FsEvent::Sync(target.clone()))
            .unwrap_or_else(|| panic!("{} never synced", target.display()));
        let closed = events
            .iter()
            .position(|e| *e == FsEvent::CloseTarget(target.clone()))
            .unwrap();
        assert!(synced < closed, "{} closed before sync", target.display());
    }
}

#[test]
fn invalid_package_name_is_rejected_before_any_io() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let recording = RecordingFs::new();
    let driver = PolicyDriver::with_fs(PolicyConfig::new(root.path()), &recording);

    let err = driver
        .run(Operation::Install, "../escape", pkg.install_path())
        .unwrap_err();

    assert!(matches!(err, Error::InvalidPackageName { .. }), "got {err:?}");
    assert!(recording.events().is_empty());
}

#[cfg(unix)]
#[test]
fn non_utf8_install_path_is_an_error_not_an_empty_batch() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = TestRoot::new();
    let parent = tempfile::tempdir().unwrap();
    let install_path = parent.path().join(OsStr::from_bytes(b"fw-\xff"));
    let policy_dir = install_path.join("meta/framework-policy/apparmor/policygroups");
    fs::create_dir_all(&policy_dir).unwrap();
    fs::write(policy_dir.join("network"), "# network\n").unwrap();
    let driver = driver(&root);

    for operation in [Operation::Install, Operation::Remove] {
        let err = driver.run(operation, "fw", &install_path).unwrap_err();
        match err {
            Error::NonUtf8Path { operation: failed, path } => {
                assert_eq!(failed, operation);
                assert!(path.starts_with(&install_path), "{}", path.display());
            }
            other => panic!("expected NonUtf8Path, got {other:?}"),
        }
    }
    assert!(fs::read_dir(root.path()).unwrap().next().is_none());

    let check_err = driver.check("fw", &install_path).unwrap_err();
    assert!(matches!(check_err, Error::NonUtf8Path { .. }), "got {check_err:?}");
}

#[test]
fn framework_op_uses_the_injected_root() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let config = PolicyConfig::new(root.path());

    framework_op(Operation::Install, pkg.name(), pkg.install_path(), &config).unwrap();
    root.assert_installed("apparmor", "policygroups", "fw_audio");

    framework_op(Operation::Remove, pkg.name(), pkg.install_path(), &config).unwrap();
    root.assert_not_installed("apparmor", "policygroups", "fw_audio");
}

#[test]
fn check_tracks_install_drift_and_removal() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let driver = driver(&root);

    let report = driver.check(pkg.name(), pkg.install_path()).unwrap();
    assert_eq!(report.status, CheckStatus::Missing);
    assert_eq!(report.missing.len(), 5);

    driver
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();
    let report = driver.check(pkg.name(), pkg.install_path()).unwrap();
    assert!(report.is_healthy(), "{report:?}");
    assert_eq!(report.checked, 5);

    let tampered = root.target_dir("seccomp", "templates").join("fw_default");
    fs::write(&tampered, "allow everything\n").unwrap();
    let report = driver.check(pkg.name(), pkg.install_path()).unwrap();
    assert_eq!(report.status, CheckStatus::Drifted);
    assert_eq!(report.drifted.len(), 1);
    assert_eq!(report.drifted[0].target, tampered);
    assert_eq!(report.drifted[0].kind, POLICY_KINDS[3]);

    driver
        .run(Operation::Remove, pkg.name(), pkg.install_path())
        .unwrap();
    let report = driver.check(pkg.name(), pkg.install_path()).unwrap();
    assert_eq!(report.status, CheckStatus::Missing);
}

#[test]
fn check_flags_an_installed_copy_that_is_not_a_file() {
    let root = TestRoot::new();
    let pkg = TestPackage::new("fw").with_policy("apparmor", "templates", "default", "x");
    let target = root.target_dir("apparmor", "templates").join("fw_default");
    fs::create_dir_all(&target).unwrap();

    let report = driver(&root).check(pkg.name(), pkg.install_path()).unwrap();

    assert_eq!(report.status, CheckStatus::Drifted);
    assert_eq!(report.drifted.len(), 1);
    assert_eq!(report.drifted[0].target, target);
    assert_eq!(
        report.drifted[0].description,
        "installed copy is not a regular file"
    );
    assert!(report.missing.is_empty());
}

#[test]
fn check_reads_files_through_the_driver_filesystem() {
    let root = TestRoot::new();
    let pkg = TestPackage::new("fw").with_policy("seccomp", "templates", "default", "deny ptrace\n");
    driver(&root)
        .run(Operation::Install, pkg.name(), pkg.install_path())
        .unwrap();
    let source = pkg.policy_dir("seccomp", "templates").join("default");
    let target = root.target_dir("seccomp", "templates").join("fw_default");
    let recording = RecordingFs::new().failing_on(Fault::OpenSource, "fw_default");

    let err = PolicyDriver::with_fs(PolicyConfig::new(root.path()), &recording)
        .check(pkg.name(), pkg.install_path())
        .unwrap_err();

    assert!(
        matches!(err, Error::Fs(policy_fs::Error::Io { ref path, .. }) if path == &target),
        "got {err:?}"
    );
    let events = recording.events();
    assert!(events.contains(&FsEvent::OpenSource(source.clone())));
    assert!(events.contains(&FsEvent::CloseSource(source)));
    assert!(events.contains(&FsEvent::OpenSource(target)));
    assert!(recording.mutations().is_empty());
}

#[test]
fn check_never_mutates() {
    let root = TestRoot::new();
    let pkg = full_package("fw");
    let recording = RecordingFs::new();
    let driver = PolicyDriver::with_fs(PolicyConfig::new(root.path()), &recording);

    driver.check(pkg.name(), pkg.install_path()).unwrap();

    assert!(recording.mutations().is_empty());
    assert!(fs::read_dir(root.path()).unwrap().next().is_none());
}

#[test]
fn check_report_serializes_for_callers() {
    let root = TestRoot::new();
    let pkg = TestPackage::new("fw").with_policy("apparmor", "templates", "default", "x");

    let report = driver(&root).check(pkg.name(), pkg.install_path()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "Missing");
    assert_eq!(json["missing"][0]["kind"]["category"], "AppArmor");
    assert_eq!(json["missing"][0]["description"], "not installed");
}
