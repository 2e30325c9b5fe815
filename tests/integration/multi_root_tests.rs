use rustvault::archiver::{ArchiveConfig, ArchiveError, Archiver};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn config() -> ArchiveConfig {
    ArchiveConfig::default().with_progress_interval(Duration::from_secs(3600))
}

#[test]
fn test_roots_share_one_store() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(first.path().join("a.bin"), vec![1u8; 2048]).unwrap();
    fs::write(second.path().join("a-copy.bin"), vec![1u8; 2048]).unwrap();
    fs::write(second.path().join("new.bin"), vec![2u8; 2048]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver
        .run(&[first.path().to_path_buf(), second.path().to_path_buf()])
        .unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.roots.len(), 2);
    assert_eq!(report.roots[0].root, fs::canonicalize(first.path()).unwrap());
    assert_eq!(report.roots[0].stats.added, 1);
    assert_eq!(report.roots[0].stats.saved_bytes, 0);
    assert_eq!(report.roots[1].stats.added, 2);
    assert_eq!(report.roots[1].stats.saved_bytes, 2048);

    assert_eq!(report.total.considered, 3);
    assert_eq!(report.total.added, 3);
    assert_eq!(report.total.saved_bytes, 2048);
}

#[test]
fn test_overlapping_roots_do_not_double_archive() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let nested = src.path().join("inner");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("n.bin"), vec![4u8; 2048]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver
        .run(&[src.path().to_path_buf(), nested.clone()])
        .unwrap();
    archiver.finish().unwrap();

    // The second pass only finds the link the first pass left behind.
    assert_eq!(report.roots[0].stats.added, 1);
    assert_eq!(report.roots[1].stats.considered, 0);
    assert!(!report.has_faults());
}

#[test]
fn test_missing_root_aborts_before_any_change() {
    let good = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let file = good.path().join("a.bin");
    fs::write(&file, vec![1u8; 2048]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let result = archiver.run(&[
        good.path().to_path_buf(),
        PathBuf::from("/nonexistent/rustvault/root"),
    ]);

    match result {
        Err(ArchiveError::SourceRoot { path, .. }) => {
            assert_eq!(path, PathBuf::from("/nonexistent/rustvault/root"));
        }
        other => panic!("expected SourceRoot error, got {other:?}"),
    }
    assert!(!fs::symlink_metadata(&file).unwrap().file_type().is_symlink());
}

#[test]
fn test_file_as_root_is_rejected() {
    let dir = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let file = dir.path().join("plain.bin");
    fs::write(&file, b"x").unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    assert!(matches!(
        archiver.run(&[file]),
        Err(ArchiveError::SourceRoot { .. })
    ));
}
