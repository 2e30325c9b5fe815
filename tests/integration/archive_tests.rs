use rustvault::archiver::{ArchiveConfig, Archiver};
use rustvault::journal::Journal;
use rustvault::scanner::Fingerprinter;
use rustvault::store::TransferMode;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn config() -> ArchiveConfig {
    ArchiveConfig::default().with_progress_interval(Duration::from_secs(3600))
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Every regular file under the store, skipping the journal and lock.
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
#[cfg(unix)]
fn test_duplicates_share_one_entry() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let payload = vec![0x41u8; 2048];
    fs::write(src.path().join("a.bin"), &payload).unwrap();
    fs::write(src.path().join("b.bin"), &payload).unwrap();
    fs::write(src.path().join("c.bin"), vec![0x42u8; 500]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    let store = fs::canonicalize(dst.path()).unwrap();
    let entries = store_entries(&store);
    assert_eq!(entries.len(), 1);

    let digest = Fingerprinter::new()
        .fingerprint_reader(&mut payload.as_slice())
        .unwrap()
        .hex();
    let expected = store.join(&digest[..2]).join(&digest);
    assert_eq!(entries[0], expected);
    assert_eq!(fs::read(&expected).unwrap(), payload);

    let src_root = fs::canonicalize(src.path()).unwrap();
    assert_eq!(fs::read_link(src_root.join("a.bin")).unwrap(), expected);
    assert_eq!(fs::read_link(src_root.join("b.bin")).unwrap(), expected);
    assert!(!is_symlink(&src_root.join("c.bin")));

    assert_eq!(report.total.considered, 3);
    assert_eq!(report.total.added, 2);
    assert_eq!(report.total.saved_bytes, 2048);
    assert_eq!(report.total.source_bytes, 2048 + 2048 + 500);
    assert_eq!(report.total.skipped_small, 1);
    assert!(!report.has_faults());

    let journal = Journal::open_read_only(&store.join("db.sqlite")).unwrap();
    assert_eq!(journal.count().unwrap(), 2);
    let mut sources: Vec<_> = journal
        .recent(10)
        .unwrap()
        .into_iter()
        .map(|r| {
            assert_eq!(r.target, expected);
            r.source
        })
        .collect();
    sources.sort();
    assert_eq!(
        sources,
        vec![src_root.join("a.bin"), src_root.join("b.bin")]
    );
}

#[test]
#[cfg(unix)]
fn test_second_run_is_a_no_op() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("one.bin"), vec![1u8; 4096]).unwrap();
    fs::write(src.path().join("two.bin"), vec![2u8; 4096]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let first = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();
    assert_eq!(first.total.added, 2);

    let store = fs::canonicalize(dst.path()).unwrap();
    let before = store_entries(&store);

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let second = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(second.total.considered, 0);
    assert_eq!(second.total.added, 0);
    assert_eq!(store_entries(&store), before);

    let journal = Journal::open_read_only(&store.join("db.sqlite")).unwrap();
    assert_eq!(journal.count().unwrap(), 2);
}

#[test]
#[cfg(unix)]
fn test_links_resolve_to_original_content() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let nested = src.path().join("deep").join("er");
    fs::create_dir_all(&nested).unwrap();
    let contents: Vec<(PathBuf, Vec<u8>)> = vec![
        (src.path().join("x.dat"), b"x".repeat(3000)),
        (nested.join("y.dat"), b"y".repeat(5000)),
        (nested.join("z.dat"), b"x".repeat(3000)),
    ];
    for (path, data) in &contents {
        fs::write(path, data).unwrap();
    }

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.added, 3);
    assert_eq!(report.total.saved_bytes, 3000);
    for (path, data) in &contents {
        assert!(is_symlink(path), "{} should be a link", path.display());
        assert_eq!(&fs::read(path).unwrap(), data);
    }
}

#[test]
#[cfg(unix)]
fn test_copy_mode_archives_too() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let file = src.path().join("copied.bin");
    fs::write(&file, vec![7u8; 70_000]).unwrap();

    let mut archiver =
        Archiver::open(dst.path(), config().with_transfer_mode(TransferMode::Copy)).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.added, 1);
    assert!(is_symlink(&file));
    assert_eq!(fs::read(&file).unwrap(), vec![7u8; 70_000]);
    assert_eq!(store_entries(&fs::canonicalize(dst.path()).unwrap()).len(), 1);
}

#[test]
#[cfg(unix)]
fn test_store_inside_source_is_not_archived() {
    let src = TempDir::new().unwrap();
    let store = src.path().join("vault");
    fs::write(src.path().join("a.bin"), vec![3u8; 2048]).unwrap();
    fs::write(src.path().join("b.bin"), vec![4u8; 2048]).unwrap();

    let mut archiver = Archiver::open(&store, config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.considered, 2);
    assert_eq!(report.total.added, 2);
    assert!(!report.has_faults());

    // Nothing left to do, and the store's own files were never candidates.
    let mut archiver = Archiver::open(&store, config()).unwrap();
    let again = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();
    assert_eq!(again.total.considered, 0);
}

#[test]
fn test_min_size_boundary_is_inclusive() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("at.bin"), vec![1u8; 1024]).unwrap();
    fs::write(src.path().join("below.bin"), vec![2u8; 1023]).unwrap();
    fs::write(src.path().join("empty.bin"), b"").unwrap();

    let mut archiver = Archiver::open(dst.path(), config().with_dry_run(true)).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();

    assert_eq!(report.total.considered, 3);
    assert_eq!(report.total.added, 1);
    assert_eq!(report.total.skipped_small, 2);
}

#[test]
fn test_second_writer_is_refused() {
    let dst = TempDir::new().unwrap();
    let _first = Archiver::open(dst.path(), config()).unwrap();

    let second = Archiver::open(dst.path(), config());
    assert!(second.is_err());
    assert!(second.unwrap_err().to_string().contains("locked"));
}

#[test]
#[cfg(unix)]
fn test_files_named_like_staging_links_survive_a_run() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let user_file = src.path().join(".a.bin.rustvault-link");
    fs::write(&user_file, b"18 bytes of notes!").unwrap();
    fs::write(src.path().join("a.bin"), vec![0x43u8; 4096]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.added, 1);
    assert_eq!(report.total.skipped_small, 1);
    assert!(!is_symlink(&user_file));
    assert_eq!(fs::read(&user_file).unwrap(), b"18 bytes of notes!");
    assert!(is_symlink(&src.path().join("a.bin")));

    // No staged links are left behind.
    let leftovers = fs::read_dir(src.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| is_symlink(&e.path()))
        .count();
    assert_eq!(leftovers, 1);
}
