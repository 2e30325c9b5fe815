//! SQLite-backed relocation journal.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};

use super::record::JournalRecord;

/// Errors from the journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The database file could not be opened or initialised.
    #[error("cannot open journal {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed.
    #[error("journal error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp in journal: {0}")]
    InvalidTimestamp(String),
}

/// Result alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Append-only sink for committed relocations.
///
/// The pipeline only ever appends; nothing reads the journal back to make
/// placement decisions.
pub trait JournalSink {
    /// Durably record one relocation.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if the record was not committed.
    fn append(&mut self, record: &JournalRecord) -> JournalResult<()>;

    /// Flush and release the sink.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if closing failed.
    fn close(self: Box<Self>) -> JournalResult<()>;
}

/// The durable journal stored in a SQLite database.
#[derive(Debug)]
pub struct Journal {
    conn: Connection,
    path: PathBuf,
}

impl Journal {
    /// Open or create the journal at `path`.
    ///
    /// # Errors
    ///
    /// [`JournalError::Open`] if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let open_err = |source| JournalError::Open {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_err)?;
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(open_err)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS link (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                added TEXT NOT NULL
            )",
            [],
        )
        .map_err(open_err)?;

        log::debug!("Opened journal {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing journal for reading only.
    ///
    /// # Errors
    ///
    /// [`JournalError::Open`] if the file does not exist or is not a journal.
    pub fn open_read_only(path: &Path) -> JournalResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| JournalError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] on query failure.
    pub fn count(&self) -> JournalResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM link", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// The most recent `limit` records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] on query failure or a malformed timestamp.
    pub fn recent(&self, limit: usize) -> JournalResult<Vec<JournalRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare("SELECT source, target, added FROM link ORDER BY rowid DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (source, target, added) = row?;
            let added = DateTime::parse_from_rfc3339(&added)
                .map_err(|_| JournalError::InvalidTimestamp(added.clone()))?
                .with_timezone(&Utc);
            records.push(JournalRecord {
                source: PathBuf::from(source),
                target: PathBuf::from(target),
                added,
            });
        }
        Ok(records)
    }
}

impl JournalSink for Journal {
    fn append(&mut self, record: &JournalRecord) -> JournalResult<()> {
        // Autocommit: each insert is its own durable transaction.
        self.conn.execute(
            "INSERT INTO link (source, target, added) VALUES (?1, ?2, ?3)",
            params![
                record.source.to_string_lossy().into_owned(),
                record.target.to_string_lossy().into_owned(),
                record.added.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn close(self: Box<Self>) -> JournalResult<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| JournalError::Sqlite(e))?;
        log::debug!("Closed journal {}", path.display());
        Ok(())
    }
}

/// In-memory sink, handy for embedding and tests.
impl JournalSink for Vec<JournalRecord> {
    fn append(&mut self, record: &JournalRecord) -> JournalResult<()> {
        self.push(record.clone());
        Ok(())
    }

    fn close(self: Box<Self>) -> JournalResult<()> {
        Ok(())
    }
}
