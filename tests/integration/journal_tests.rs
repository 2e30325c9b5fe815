use rustvault::archiver::{ArchiveConfig, Archiver};
use rustvault::journal::{Journal, JournalRecord, JournalSink};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn config() -> ArchiveConfig {
    ArchiveConfig::default().with_progress_interval(Duration::from_secs(3600))
}

#[test]
fn test_journal_accumulates_across_runs() {
    let dst = TempDir::new().unwrap();

    for content in [1u8, 2u8] {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("f.bin"), vec![content; 2048]).unwrap();
        let mut archiver = Archiver::open(dst.path(), config()).unwrap();
        archiver.run(&[src.path().to_path_buf()]).unwrap();
        archiver.finish().unwrap();
    }

    let journal = Journal::open_read_only(&dst.path().join("db.sqlite")).unwrap();
    assert_eq!(journal.count().unwrap(), 2);

    let records = journal.recent(10).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].added >= records[1].added);
}

#[test]
fn test_custom_journal_file_name() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("f.bin"), vec![3u8; 2048]).unwrap();

    let mut archiver =
        Archiver::open(dst.path(), config().with_journal_file("relocations.sqlite")).unwrap();
    archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert!(!dst.path().join("db.sqlite").exists());
    let journal = Journal::open_read_only(&dst.path().join("relocations.sqlite")).unwrap();
    assert_eq!(journal.count().unwrap(), 1);
}

#[test]
fn test_small_and_failed_files_are_not_journaled() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("small.bin"), vec![1u8; 10]).unwrap();

    let mut archiver = Archiver::open(dst.path(), config()).unwrap();
    let report = archiver.run(&[src.path().to_path_buf()]).unwrap();
    archiver.finish().unwrap();

    assert_eq!(report.total.added, 0);
    let journal = Journal::open_read_only(&dst.path().join("db.sqlite")).unwrap();
    assert_eq!(journal.count().unwrap(), 0);
}

#[test]
fn test_missing_journal_cannot_be_read() {
    let dir = TempDir::new().unwrap();
    assert!(Journal::open_read_only(&dir.path().join("db.sqlite")).is_err());
}

#[test]
fn test_recent_honours_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite");
    let mut journal = Journal::open(&path).unwrap();
    for i in 0..5 {
        let source = format!("/data/{i}.bin");
        journal
            .append(&JournalRecord::now(Path::new(&source), Path::new("/vault/ab/ab")))
            .unwrap();
    }
    Box::new(journal).close().unwrap();

    let journal = Journal::open_read_only(&path).unwrap();
    let records = journal.recent(2).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source, Path::new("/data/4.bin"));
    assert_eq!(records[1].source, Path::new("/data/3.bin"));
}
