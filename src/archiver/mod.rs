//! Archive orchestration.
//!
//! # Overview
//!
//! The [`Archiver`] drives every source root through the pipeline:
//!
//! 1. **Traversal**: [`crate::scanner::Walker`] yields candidates
//! 2. **Fingerprint**: files at or above the minimum size are hashed
//! 3. **Placement**: [`crate::store::ContentStore`] classifies and stores
//! 4. **Rewire**: the source becomes a symlink to the canonical entry
//! 5. **Journal**: the relocation is recorded
//!
//! Each candidate ends in a [`FileOutcome`] or a [`FileFault`]; a fault
//! never stops the run. Only [`ArchiveError`]s (startup problems) do.
//!
//! # Example
//!
//! ```no_run
//! use rustvault::archiver::{ArchiveConfig, Archiver};
//! use std::path::{Path, PathBuf};
//!
//! let config = ArchiveConfig::default().with_dry_run(true);
//! let mut archiver = Archiver::open(Path::new("/archive"), config).unwrap();
//! let report = archiver.run(&[PathBuf::from("/data")]).unwrap();
//! println!("{}", report.total.summary());
//! archiver.finish().unwrap();
//! ```

pub mod pipeline;
pub mod stats;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actions::RewireError;
use crate::journal::JournalError;
use crate::scanner::{HashError, ScanError, BLOCK_SIZE};
use crate::store::{StoreConfig, StoreError, TransferMode};

pub use pipeline::Archiver;
pub use stats::{RootReport, RunReport, RunStats};

/// Default minimum file size in bytes.
pub const DEFAULT_MIN_SIZE: u64 = 1024;

/// Default interval between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Default journal file name inside the store root.
pub const DEFAULT_JOURNAL_FILE: &str = "db.sqlite";

/// Everything the pipeline needs to know, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Files smaller than this are left untouched.
    pub min_size: u64,
    /// Relocation strategy for new store entries.
    pub transfer_mode: TransferMode,
    /// Compare first blocks before linking to an existing entry.
    pub verify_prefix: bool,
    /// Report intended actions only.
    pub dry_run: bool,
    /// Wall-clock interval between progress lines.
    pub progress_interval: Duration,
    /// Journal file name, relative to the store root.
    pub journal_file: String,
    /// Read size for fingerprinting.
    pub block_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            transfer_mode: TransferMode::Move,
            verify_prefix: true,
            dry_run: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            journal_file: DEFAULT_JOURNAL_FILE.to_string(),
            block_size: BLOCK_SIZE,
        }
    }
}

impl ArchiveConfig {
    /// Set the minimum file size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the transfer mode.
    #[must_use]
    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }

    /// Enable/disable first-block verification.
    #[must_use]
    pub fn with_verify_prefix(mut self, verify: bool) -> Self {
        self.verify_prefix = verify;
        self
    }

    /// Enable/disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the progress interval.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the journal file name.
    #[must_use]
    pub fn with_journal_file(mut self, name: impl Into<String>) -> Self {
        self.journal_file = name.into();
        self
    }

    /// Store settings derived from this configuration.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_transfer_mode(self.transfer_mode)
            .with_verify_prefix(self.verify_prefix)
            .with_dry_run(self.dry_run)
    }
}

/// What happened to one candidate that did not fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Below the minimum size; never hashed or touched.
    TooSmall { size: u64 },
    /// First occurrence moved into the store and linked.
    Archived { target: PathBuf, size: u64 },
    /// Duplicate of an existing entry; replaced by a link.
    Linked { target: PathBuf, size: u64 },
    /// Dry run: would have been archived.
    WouldArchive { target: PathBuf, size: u64 },
    /// Dry run: would have been linked to an existing entry.
    WouldLink { target: PathBuf, size: u64 },
}

impl FileOutcome {
    /// Size of the file in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::TooSmall { size }
            | Self::Archived { size, .. }
            | Self::Linked { size, .. }
            | Self::WouldArchive { size, .. }
            | Self::WouldLink { size, .. } => *size,
        }
    }

    /// Whether the file was (or would be) rewired.
    #[must_use]
    pub fn is_added(&self) -> bool {
        !matches!(self, Self::TooSmall { .. })
    }

    /// Bytes saved by deduplication.
    #[must_use]
    pub fn saved_bytes(&self) -> u64 {
        match self {
            Self::Linked { size, .. } | Self::WouldLink { size, .. } => *size,
            _ => 0,
        }
    }

    /// Canonical target of a committed (non-simulated) rewire.
    #[must_use]
    pub fn committed_target(&self) -> Option<&Path> {
        match self {
            Self::Archived { target, .. } | Self::Linked { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Phase a fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Entry could not be listed or inspected.
    Traversal,
    /// File could not be read.
    Fingerprint,
    /// Existing store entry failed size/prefix verification.
    Verification,
    /// Directory creation, transfer, permission change or link failed.
    Mutation,
    /// The rewire succeeded but its journal record did not.
    Journal,
}

/// A per-file failure. The file is skipped and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum FileFault {
    /// The walk could not inspect the entry.
    #[error("traversal failed: {0}")]
    Traversal(#[from] ScanError),

    /// Reading the file failed.
    #[error("fingerprinting failed: {0}")]
    Fingerprint(#[from] HashError),

    /// The existing canonical entry could not be verified.
    #[error("verification failed: {0}")]
    Verification(#[source] StoreError),

    /// Creating the canonical entry failed.
    #[error("placement failed: {0}")]
    Placement(#[source] StoreError),

    /// Replacing the source with a link failed.
    #[error("rewire failed: {0}")]
    Rewire(#[from] RewireError),
}

impl FileFault {
    /// Phase classification for counters and log levels.
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Traversal(_) => FaultKind::Traversal,
            Self::Fingerprint(_) => FaultKind::Fingerprint,
            Self::Verification(_) => FaultKind::Verification,
            Self::Placement(_) | Self::Rewire(_) => FaultKind::Mutation,
        }
    }
}

/// Fatal errors: the run cannot start (or continue) at all.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The store could not be opened, created or locked.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The journal could not be opened or closed.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// A source root does not exist or is not a directory.
    #[error("source root {path} is not a readable directory: {source}")]
    SourceRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
