//! Run statistics and reports.

use std::path::PathBuf;

use bytesize::ByteSize;
use serde::Serialize;

use super::{FaultKind, FileOutcome};

/// Counters accumulated over a run (or over one source root).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Regular, non-symlink files yielded by traversal
    pub considered: u64,
    /// Files rewired (would be rewired, in a dry run)
    pub added: u64,
    /// Bytes of every considered file that was exempt or fingerprinted
    pub source_bytes: u64,
    /// Bytes of files whose content was already stored
    pub saved_bytes: u64,
    /// Files below the minimum size
    pub skipped_small: u64,
    /// Entries the walk could not inspect
    pub traversal_faults: u64,
    /// Files that could not be read in full
    pub fingerprint_faults: u64,
    /// Files whose existing store entry failed verification
    pub verification_faults: u64,
    /// Files whose placement or rewire failed
    pub mutation_faults: u64,
    /// Rewires that could not be journaled
    pub journal_faults: u64,
}

impl RunStats {
    /// Account for one successfully handled candidate.
    pub fn record_outcome(&mut self, outcome: &FileOutcome) {
        self.source_bytes += outcome.size();
        if outcome.is_added() {
            self.added += 1;
        } else {
            self.skipped_small += 1;
        }
        self.saved_bytes += outcome.saved_bytes();
    }

    /// Account for one fault.
    pub fn record_fault(&mut self, kind: FaultKind) {
        match kind {
            FaultKind::Traversal => self.traversal_faults += 1,
            FaultKind::Fingerprint => self.fingerprint_faults += 1,
            FaultKind::Verification => self.verification_faults += 1,
            FaultKind::Mutation => self.mutation_faults += 1,
            FaultKind::Journal => self.journal_faults += 1,
        }
    }

    /// Total number of faults of every kind.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.traversal_faults
            + self.fingerprint_faults
            + self.verification_faults
            + self.mutation_faults
            + self.journal_faults
    }

    /// Add another set of counters to this one.
    pub fn merge(&mut self, other: &RunStats) {
        self.considered += other.considered;
        self.added += other.added;
        self.source_bytes += other.source_bytes;
        self.saved_bytes += other.saved_bytes;
        self.skipped_small += other.skipped_small;
        self.traversal_faults += other.traversal_faults;
        self.fingerprint_faults += other.fingerprint_faults;
        self.verification_faults += other.verification_faults;
        self.mutation_faults += other.mutation_faults;
        self.journal_faults += other.journal_faults;
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} added out of {} files considered, total size {}, saved {}",
            self.added,
            self.considered,
            ByteSize::b(self.source_bytes),
            ByteSize::b(self.saved_bytes)
        );
        let faults = self.fault_count();
        if faults > 0 {
            line.push_str(&format!(", {faults} skipped due to errors"));
        }
        line
    }
}

/// Statistics for one source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootReport {
    /// The source root as resolved for the walk
    pub root: PathBuf,
    /// Counters for this root only
    pub stats: RunStats,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Whether the run only simulated
    pub dry_run: bool,
    /// Resolved store root
    pub target: PathBuf,
    /// Per-root counters, in processing order
    pub roots: Vec<RootReport>,
    /// Sum over every root
    pub total: RunStats,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
}

impl RunReport {
    /// Start an empty report.
    #[must_use]
    pub fn new(target: PathBuf, dry_run: bool) -> Self {
        Self {
            dry_run,
            target,
            roots: Vec::new(),
            total: RunStats::default(),
            interrupted: false,
        }
    }

    /// Append a finished root and fold it into the total.
    pub fn push_root(&mut self, report: RootReport) {
        self.total.merge(&report.stats);
        self.roots.push(report);
    }

    /// Whether any candidate in the run faulted.
    #[must_use]
    pub fn has_faults(&self) -> bool {
        self.total.fault_count() > 0
    }
}
