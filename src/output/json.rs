//! JSON output.
//!
//! # Run report schema
//!
//! ```json
//! {
//!   "dry_run": false,
//!   "target": "/vault",
//!   "roots": [
//!     { "root": "/data", "stats": { "considered": 3, "added": 2, "...": 0 } }
//!   ],
//!   "total": { "considered": 3, "added": 2, "source_bytes": 4596, "saved_bytes": 2048 },
//!   "interrupted": false,
//!   "exit_code": 0,
//!   "exit_code_name": "RV000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::archiver::RunReport;
use crate::error::ExitCode;
use crate::journal::JournalRecord;

/// A run report plus the exit code it maps to.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    /// The exit code number
    exit_code: i32,
    /// The machine-readable exit code name (e.g., "RV003")
    exit_code_name: &'static str,
}

impl<'a> JsonReport<'a> {
    /// Wrap a finished report.
    #[must_use]
    pub fn new(report: &'a RunReport, exit_code: ExitCode) -> Self {
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Serialize to a pretty-printed string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}

/// A page of journal records.
#[derive(Debug, Serialize)]
pub struct JsonJournal<'a> {
    /// Records in the journal overall
    total: u64,
    /// The newest records, newest first
    records: &'a [JournalRecord],
}

impl<'a> JsonJournal<'a> {
    #[must_use]
    pub fn new(total: u64, records: &'a [JournalRecord]) -> Self {
        Self { total, records }
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}
