//! The archive pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::actions::replace_with_link;
use crate::journal::{Journal, JournalRecord, JournalSink};
use crate::progress::{ProgressCallback, ProgressTicker};
use crate::scanner::{Candidate, Fingerprinter, Walker, WalkerConfig};
use crate::store::{ContentStore, Placement};

use super::{ArchiveConfig, ArchiveError, FaultKind, FileFault, FileOutcome};
use super::{RootReport, RunReport, RunStats};

/// Drives traversal, fingerprinting, placement, rewire and journaling.
///
/// The pipeline is sequential. One `Archiver` owns the store (and its
/// lock) and the journal for the duration of a run; [`Self::finish`]
/// closes the journal explicitly, and dropping the archiver releases
/// everything on any other exit path.
pub struct Archiver {
    config: ArchiveConfig,
    store: ContentStore,
    journal: Option<Box<dyn JournalSink>>,
    fingerprinter: Fingerprinter,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("config", &self.config)
            .field("store", &self.store.root())
            .field("journal", &self.journal.as_ref().map(|_| "<journal>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Archiver {
    /// Open the store at `target` and, for real runs, its journal.
    ///
    /// # Errors
    ///
    /// [`ArchiveError`] if the store cannot be created, probed or locked, or
    /// the journal cannot be opened.
    pub fn open(target: &Path, config: ArchiveConfig) -> Result<Self, ArchiveError> {
        let store = ContentStore::open(target, config.store_config())?;
        let journal: Option<Box<dyn JournalSink>> = if config.dry_run {
            None
        } else {
            let path = store.root().join(&config.journal_file);
            Some(Box::new(Journal::open(&path)?))
        };
        Ok(Self::with_parts(config, store, journal))
    }

    /// Assemble an archiver from an already opened store and sink.
    #[must_use]
    pub fn with_parts(
        config: ArchiveConfig,
        store: ContentStore,
        journal: Option<Box<dyn JournalSink>>,
    ) -> Self {
        let fingerprinter = Fingerprinter::with_block_size(config.block_size);
        Self {
            config,
            store,
            journal,
            fingerprinter,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// The flag is checked between candidates, never inside one.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The store this archiver writes to.
    #[must_use]
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Archive every root in order into the shared store and journal.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::SourceRoot`] if a root is missing or not a
    /// directory. Roots are all checked before any file is touched.
    pub fn run(&mut self, roots: &[PathBuf]) -> Result<RunReport, ArchiveError> {
        let resolved = roots
            .iter()
            .map(|root| resolve_root(root))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "{}archiving {} source root(s) into {}",
            if self.config.dry_run { "[dry run] " } else { "" },
            resolved.len(),
            self.store.root().display()
        );

        let mut report = RunReport::new(self.store.root().to_path_buf(), self.config.dry_run);
        for root in resolved {
            let (root_report, interrupted) = self.run_root(&root);
            log::info!(
                "done archiving {} to {}: {}",
                root.display(),
                self.store.root().display(),
                root_report.stats.summary()
            );
            report.push_root(root_report);
            if interrupted {
                report.interrupted = true;
                log::warn!("Run interrupted; remaining roots skipped");
                break;
            }
        }

        Ok(report)
    }

    /// Drain one root. Returns its report and whether shutdown cut it short.
    fn run_root(&mut self, root: &Path) -> (RootReport, bool) {
        let mut stats = RunStats::default();
        let mut ticker = ProgressTicker::new(self.config.progress_interval);

        if let Some(cb) = &self.progress_callback {
            cb.on_root_start(root);
        }

        let walker_config = WalkerConfig::default().with_exclude(self.store.root().to_path_buf());
        let mut walker = Walker::new(root, walker_config);
        if let Some(flag) = &self.shutdown_flag {
            // The walker stops pulling entries once the flag is set.
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        for entry in walker.walk() {
            match entry {
                Ok(candidate) => {
                    stats.considered += 1;
                    self.handle_candidate(&candidate, &mut stats);
                    if let Some(cb) = &self.progress_callback {
                        cb.on_file(&candidate.path, &stats);
                    }
                }
                Err(e) => {
                    let path = e.path().to_path_buf();
                    let fault = FileFault::from(e);
                    log_fault(&path, &fault);
                    stats.record_fault(fault.kind());
                }
            }

            ticker.tick(&stats);
        }
        let interrupted = self.is_shutdown_requested();

        if let Some(cb) = &self.progress_callback {
            cb.on_root_end(root, &stats);
        }

        (
            RootReport {
                root: root.to_path_buf(),
                stats,
            },
            interrupted,
        )
    }

    /// Process one candidate and fold the result into `stats`.
    fn handle_candidate(&mut self, candidate: &Candidate, stats: &mut RunStats) {
        match self.process(candidate) {
            Ok(outcome) => {
                if let Some(target) = outcome.committed_target() {
                    if !self.record(&candidate.path, target) {
                        stats.record_fault(FaultKind::Journal);
                    }
                }
                stats.record_outcome(&outcome);
            }
            Err(fault) => {
                log_fault(&candidate.path, &fault);
                stats.record_fault(fault.kind());
            }
        }
    }

    /// Run the per-file pipeline for one candidate.
    ///
    /// # Errors
    ///
    /// A [`FileFault`] classifying the phase that failed. The source is
    /// unchanged whenever a fault is returned.
    pub fn process(&mut self, candidate: &Candidate) -> Result<FileOutcome, FileFault> {
        let path = &candidate.path;

        if candidate.size < self.config.min_size {
            log::debug!(
                "skipping {}: file size is {}, smaller than {}",
                path.display(),
                candidate.size,
                self.config.min_size
            );
            return Ok(FileOutcome::TooSmall {
                size: candidate.size,
            });
        }

        log::debug!("processing {}", path.display());
        let fp = self.fingerprinter.fingerprint(path)?;
        let size = fp.size;

        let placement = self.store.classify(&fp).map_err(FileFault::Verification)?;
        if placement.is_duplicate() {
            self.store
                .reject_alias(path, placement.target())
                .map_err(FileFault::Verification)?;
        }

        if self.config.dry_run {
            return Ok(match placement {
                Placement::Duplicate { target } => {
                    log::info!(
                        "would create symlink to existing file: {} -> {}",
                        path.display(),
                        target.display()
                    );
                    FileOutcome::WouldLink { target, size }
                }
                Placement::FirstOccurrence { target } => {
                    log::info!(
                        "would move file to archive: {} -> {}",
                        path.display(),
                        target.display()
                    );
                    FileOutcome::WouldArchive { target, size }
                }
            });
        }

        match placement {
            Placement::Duplicate { target } => {
                replace_with_link(path, &target)?;
                log::info!(
                    "symlink to existing file: {} -> {}",
                    path.display(),
                    target.display()
                );
                Ok(FileOutcome::Linked { target, size })
            }
            Placement::FirstOccurrence { .. } => {
                let placed = self.store.place(path, &fp).map_err(FileFault::Placement)?;
                if let Err(e) = replace_with_link(path, &placed.target) {
                    self.store.abandon(&placed);
                    return Err(e.into());
                }
                log::info!(
                    "moved file to archive: {} -> {}",
                    path.display(),
                    placed.target.display()
                );
                Ok(FileOutcome::Archived {
                    target: placed.target,
                    size,
                })
            }
        }
    }

    /// Append the journal record for a committed rewire.
    fn record(&mut self, source: &Path, target: &Path) -> bool {
        let Some(journal) = self.journal.as_mut() else {
            return true;
        };
        match journal.append(&JournalRecord::now(source, target)) {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "{} was rewired to {} but could not be journaled: {}",
                    source.display(),
                    target.display(),
                    e
                );
                false
            }
        }
    }

    /// Close the journal and release the store lock.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Journal`] if the journal could not be closed cleanly.
    pub fn finish(mut self) -> Result<(), ArchiveError> {
        if let Some(journal) = self.journal.take() {
            journal.close()?;
        }
        Ok(())
    }
}

/// Resolve a source root to an absolute directory path.
fn resolve_root(root: &Path) -> Result<PathBuf, ArchiveError> {
    let resolved = fs::canonicalize(root).map_err(|source| ArchiveError::SourceRoot {
        path: root.to_path_buf(),
        source,
    })?;
    if !resolved.is_dir() {
        return Err(ArchiveError::SourceRoot {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }
    Ok(resolved)
}

/// Log a fault at the level its phase calls for.
fn log_fault(path: &Path, fault: &FileFault) {
    match fault.kind() {
        FaultKind::Traversal | FaultKind::Fingerprint => {
            log::warn!("skipping {}: {}", path.display(), fault);
        }
        FaultKind::Verification => {
            log::error!(
                "skipping {}: {} (possible digest collision or store corruption; nothing was changed)",
                path.display(),
                fault
            );
        }
        FaultKind::Mutation | FaultKind::Journal => {
            log::error!("skipping {}: {}", path.display(), fault);
        }
    }
}
