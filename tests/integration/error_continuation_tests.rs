#![cfg(unix)]

use rustvault::archiver::{ArchiveConfig, Archiver};
use rustvault::error::ExitCode;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn config() -> ArchiveConfig {
    ArchiveConfig::default().with_progress_interval(Duration::from_secs(3600))
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Permission bits are not enforced for privileged users.
fn permissions_enforced() -> bool {
    let dir = TempDir::new().unwrap();
    let probe = dir.path().join("probe");
    fs::write(&probe, b"x").unwrap();
    fs::set_permissions(&probe, fs::Permissions::from_mode(0o000)).unwrap();
    let enforced = fs::read(&probe).is_err();
    fs::set_permissions(&probe, fs::Permissions::from_mode(0o644)).unwrap();
    enforced
}

/// Archive `content` once and return the path of its store entry.
fn seed_store(dst: &Path, content: &[u8]) -> std::path::PathBuf {
    let seed = TempDir::new().unwrap();
    let file = seed.path().join("seed.bin");
    fs::write(&file, content).unwrap();
    let mut archiver = Archiver::open(dst, config()).unwrap();
    archiver.run(&[seed.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();
    fs::read_link(&file).unwrap()
}

#[test]
fn test_unreadable_file_is_skipped_and_run_continues() {
    if !permissions_enforced() {
        return;
    }

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let locked = src.path().join("a-locked.bin");
    let fine = src.path().join("b-fine.bin");
    fs::write(&locked, vec![1u8; 2048]).unwrap();
    fs::write(&fine, vec![2u8; 2048]).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.total.considered, 2);
    assert_eq!(report.total.fingerprint_faults, 1);
    assert_eq!(report.total.added, 1);
    // Only the readable file's bytes were seen.
    assert_eq!(report.total.source_bytes, 2048);
    assert!(!is_symlink(&locked));
    assert!(is_symlink(&fine));
    assert_eq!(ExitCode::from_report(&report), ExitCode::PartialSuccess);
}

#[test]
fn test_tampered_entry_is_a_verification_fault() {
    let dst = TempDir::new().unwrap();
    let content = vec![0x10u8; 4096];
    let entry = seed_store(dst.path(), &content);

    // Same size, different first block.
    fs::set_permissions(&entry, fs::Permissions::from_mode(0o644)).unwrap();
    fs::write(&entry, vec![0x20u8; 4096]).unwrap();
    fs::set_permissions(&entry, fs::Permissions::from_mode(0o444)).unwrap();

    let src = TempDir::new().unwrap();
    let file = src.path().join("same.bin");
    fs::write(&file, &content).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.verification_faults, 1);
    assert_eq!(report.total.added, 0);
    assert!(!is_symlink(&file));
    assert_eq!(fs::read(&file).unwrap(), content);
    assert_eq!(fs::read(&entry).unwrap(), vec![0x20u8; 4096]);
}

#[test]
fn test_truncated_entry_is_a_verification_fault() {
    let dst = TempDir::new().unwrap();
    let content = vec![0x30u8; 4096];
    let entry = seed_store(dst.path(), &content);

    fs::set_permissions(&entry, fs::Permissions::from_mode(0o644)).unwrap();
    fs::write(&entry, vec![0x30u8; 100]).unwrap();
    fs::set_permissions(&entry, fs::Permissions::from_mode(0o444)).unwrap();

    let src = TempDir::new().unwrap();
    let file = src.path().join("same.bin");
    fs::write(&file, &content).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.verification_faults, 1);
    assert!(!is_symlink(&file));
}

#[test]
fn test_disabled_prefix_check_trusts_the_digest() {
    let dst = TempDir::new().unwrap();
    let content = vec![0x40u8; 4096];
    let entry = seed_store(dst.path(), &content);

    fs::set_permissions(&entry, fs::Permissions::from_mode(0o644)).unwrap();
    fs::write(&entry, vec![0x50u8; 4096]).unwrap();
    fs::set_permissions(&entry, fs::Permissions::from_mode(0o444)).unwrap();

    let src = TempDir::new().unwrap();
    let file = src.path().join("same.bin");
    fs::write(&file, &content).unwrap();

    let mut archiver = Archiver::open(dst.path(), config().with_verify_prefix(false)).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.verification_faults, 0);
    assert_eq!(report.total.added, 1);
    assert_eq!(fs::read_link(&file).unwrap(), entry);
}

#[test]
fn test_unwritable_store_is_fatal() {
    if !permissions_enforced() {
        return;
    }

    let parent = TempDir::new().unwrap();
    let store = parent.path().join("vault");
    fs::create_dir(&store).unwrap();
    fs::set_permissions(&store, fs::Permissions::from_mode(0o555)).unwrap();

    let result = Archiver::open(&store, config());
    fs::set_permissions(&store, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(result.is_err());
}

#[test]
fn test_unreadable_directory_is_a_traversal_fault() {
    if !permissions_enforced() {
        return;
    }

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let closed = src.path().join("closed");
    fs::create_dir(&closed).unwrap();
    fs::write(closed.join("hidden.bin"), vec![1u8; 2048]).unwrap();
    fs::write(src.path().join("open.bin"), vec![2u8; 2048]).unwrap();
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o000)).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.total.traversal_faults, 1);
    assert_eq!(report.total.added, 1);
}
