//! Report and journal formatters.
//!
//! - [`text`]: human-readable summaries, sizes via `bytesize`
//! - [`json`]: machine-readable output for scripting
//!
//! # Example
//!
//! ```no_run
//! use rustvault::archiver::{ArchiveConfig, Archiver};
//! use rustvault::error::ExitCode;
//! use rustvault::output::json::JsonReport;
//! use std::path::{Path, PathBuf};
//!
//! let mut archiver = Archiver::open(Path::new("/vault"), ArchiveConfig::default()).unwrap();
//! let report = archiver.run(&[PathBuf::from("/data")]).unwrap();
//! let exit_code = ExitCode::from_report(&report);
//! println!("{}", JsonReport::new(&report, exit_code).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonJournal, JsonReport};
