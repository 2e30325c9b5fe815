//! Content-addressed store.
//!
//! Every archived file lives at `<root>/<first two hex chars>/<full hex digest>`
//! and is read-only for every permission class once placed. At most one
//! canonical entry exists per digest.
//!
//! # Architecture
//!
//! * [`content`]: placement decisions, verification, transfer, hardening.
//! * [`lock`]: advisory lock giving one writer per store root.
//!
//! # Duplicate verification
//!
//! A digest whose canonical entry already exists is treated as a duplicate
//! after checking the entry's size and its first block against the
//! candidate. The stored file is never re-read in full, so a match is a
//! bounded-risk heuristic, not a proof of equality. Disable the first-block
//! comparison with [`StoreConfig::verify_prefix`].
//!
//! A candidate that resolves to the canonical entry itself (the same device
//! and inode, reached through a directory symlink) is refused before any
//! rewire.
//!
//! # Source stability
//!
//! A first occurrence is published only if the source still has the size and
//! modification time it had when it was fingerprinted. Move mode checks again
//! after the hard link, since the entry then shares the source inode. A writer
//! that changes the file within the same timestamp tick and keeps its size is
//! not detected; the files must be quiescent during a run.
//!
//! # Concurrency
//!
//! Two real runs against the same root are excluded by [`StoreLock`]. Without
//! it, the check for an existing entry and its creation race across
//! processes.

pub mod content;
pub mod lock;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use content::{ContentStore, Placed, Placement};
pub use lock::{StoreLock, LOCK_FILE};

/// How a first-occurrence file is relocated into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Relocate without copying (hard link) when the store shares the
    /// filesystem with the source, falling back to a copy otherwise.
    #[default]
    Move,
    /// Always copy the bytes into the store.
    Copy,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Store behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Relocation strategy for new entries.
    pub transfer_mode: TransferMode,
    /// Compare the first block of an existing entry before linking to it.
    pub verify_prefix: bool,
    /// Simulate only: never touch the filesystem.
    pub dry_run: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            transfer_mode: TransferMode::Move,
            verify_prefix: true,
            dry_run: false,
        }
    }
}

impl StoreConfig {
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
}

/// Errors raised by the content store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store root could not be created or resolved.
    #[error("cannot create store root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store root exists but cannot be written.
    #[error("store root is not writable {path}: {source}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the store lock.
    #[error("store {0} is locked by another archiver run")]
    Locked(PathBuf),

    /// Existing canonical entry has a different size than the candidate.
    #[error("integrity fault: {target} is {found} bytes, candidate is {expected} bytes")]
    SizeMismatch {
        target: PathBuf,
        expected: u64,
        found: u64,
    },

    /// Existing canonical entry's first block differs from the candidate's.
    #[error("integrity fault: first block of {target} does not match candidate")]
    PrefixMismatch { target: PathBuf },

    /// Something other than a regular file sits at the canonical path.
    #[error("integrity fault: {0} is not a regular file")]
    NotAFile(PathBuf),

    /// The canonical entry appeared while this file was being placed.
    #[error("canonical entry {0} was created concurrently")]
    AlreadyExists(PathBuf),

    /// The source changed size between fingerprinting and transfer.
    #[error("source {path} changed during archiving: expected {expected} bytes, copied {found}")]
    SourceChanged {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    /// The source was rewritten after it was fingerprinted.
    #[error("source {0} was modified after fingerprinting")]
    SourceModified(PathBuf),

    /// The candidate is the canonical entry itself, reached by another path.
    #[error("integrity fault: {path} is the canonical entry {target}")]
    AliasOfEntry { path: PathBuf, target: PathBuf },

    /// Placement was requested on a dry-run store.
    #[error("store is in dry-run mode")]
    DryRun,

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// True for faults that suggest a digest collision or a damaged store.
    #[must_use]
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            Self::SizeMismatch { .. }
                | Self::PrefixMismatch { .. }
                | Self::NotAFile(_)
                | Self::AliasOfEntry { .. }
        )
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
