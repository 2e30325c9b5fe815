#![cfg(unix)]

use rustvault::archiver::{ArchiveConfig, Archiver};
use rustvault::journal::Journal;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn config() -> ArchiveConfig {
    ArchiveConfig::default().with_progress_interval(Duration::from_secs(3600))
}

fn link_target(path: &Path) -> PathBuf {
    fs::read_link(path).unwrap()
}

#[test]
fn test_file_symlinks_are_left_alone() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let real = outside.path().join("real.bin");
    fs::write(&real, vec![1u8; 4096]).unwrap();
    symlink(&real, src.path().join("link.bin")).unwrap();
    symlink("/nonexistent/target", src.path().join("dangling.bin")).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.considered, 0);
    assert!(!report.has_faults());
    assert_eq!(link_target(&src.path().join("link.bin")), real);
    assert_eq!(
        link_target(&src.path().join("dangling.bin")),
        Path::new("/nonexistent/target")
    );
    assert!(!fs::symlink_metadata(&real).unwrap().file_type().is_symlink());
}

#[test]
fn test_directory_symlinks_are_followed() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let inner = outside.path().join("photos");
    fs::create_dir(&inner).unwrap();
    fs::write(inner.join("p.jpg"), vec![2u8; 4096]).unwrap();
    symlink(&inner, src.path().join("photos")).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.considered, 1);
    assert_eq!(report.total.added, 1);
    // The file reached through the directory link was rewired in place.
    assert!(fs::symlink_metadata(inner.join("p.jpg"))
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(fs::read(inner.join("p.jpg")).unwrap(), vec![2u8; 4096]);
}

#[test]
fn test_directory_loop_is_a_traversal_fault() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let sub = src.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("f.bin"), vec![3u8; 2048]).unwrap();
    symlink(src.path(), sub.join("back")).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.traversal_faults, 1);
    assert_eq!(report.total.added, 1);
}

/// Every file in the store's shard directories.
fn store_entries(store: &Path) -> Vec<PathBuf> {
    let mut entries = Vec::new();
    for shard in fs::read_dir(store).unwrap().filter_map(Result::ok) {
        if shard.file_type().unwrap().is_dir() {
            for entry in fs::read_dir(shard.path()).unwrap().filter_map(Result::ok) {
                entries.push(entry.path());
            }
        }
    }
    entries.sort();
    entries
}

#[test]
fn test_store_reached_through_directory_symlink_is_not_archived() {
    let src = TempDir::new().unwrap();
    let base = TempDir::new().unwrap();
    let vault = base.path().join("vault");
    let payload = vec![0x61u8; 4096];
    fs::write(src.path().join("a.bin"), &payload).unwrap();
    fs::write(base.path().join("notes.bin"), vec![0x62u8; 4096]).unwrap();

    let mut archiver = Archiver::open(&vault, config()).unwrap();
    archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();
    let store = fs::canonicalize(&vault).unwrap();
    let before = store_entries(&store);
    assert_eq!(before.len(), 1);

    // Links to the store and to its parent directory inside the source root.
    symlink(&vault, src.path().join("store_view")).unwrap();
    symlink(base.path(), src.path().join("base_view")).unwrap();

    let mut archiver = Archiver::open(&vault, config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    // Only the sibling of the store is new work.
    assert_eq!(report.total.considered, 1);
    assert_eq!(report.total.added, 1);
    assert!(!report.has_faults());

    let after = store_entries(&store);
    assert_eq!(after.len(), 2);
    for entry in &after {
        let meta = fs::symlink_metadata(entry).unwrap();
        assert!(meta.file_type().is_file(), "{} is not a regular file", entry.display());
        assert_eq!(meta.permissions().mode() & 0o222, 0);
    }
    assert!(after.contains(&before[0]));

    let journal_path = store.join(ArchiveConfig::default().journal_file);
    assert!(fs::symlink_metadata(&journal_path).unwrap().file_type().is_file());
    assert_eq!(Journal::open_read_only(&journal_path).unwrap().count().unwrap(), 2);
    assert_eq!(fs::read(src.path().join("a.bin")).unwrap(), payload);
}
