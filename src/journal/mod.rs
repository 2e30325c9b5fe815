//! Relocation journal for RustVault.
//!
//! Every committed rewire appends exactly one record
//! `(source, target, added)`. Records are never updated or deleted, and the
//! archiving pipeline never reads them back.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence and the [`JournalSink`] trait.
//! * [`record`]: the record type shared by the sink and the `journal` command.
//!
//! The default database is `db.sqlite` inside the store root. Each insert
//! runs in autocommit mode with `synchronous=FULL`, trading batch throughput
//! for a journal that is complete up to the last finished file.

pub mod database;
pub mod record;

pub use database::{Journal, JournalError, JournalResult, JournalSink};
pub use record::JournalRecord;
