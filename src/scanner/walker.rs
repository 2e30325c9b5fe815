//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing source roots
//! and yielding archive [`Candidate`]s. The walk is sequential and sorted by
//! file name so repeated runs visit files in the same order.
//!
//! # Features
//!
//! - Follows directory symlinks (walkdir detects loops)
//! - Never yields a path that is itself a symlink
//! - Excluded directories (the store) are pruned, not descended into, even
//!   when reached through a symlink
//! - Per-entry errors are yielded, the walk continues
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use rustvault::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/srv/data"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{Candidate, ScanError, WalkerConfig};

/// Directory walker for candidate discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Resolved form of each excluded directory
    resolved_exclude: Vec<PathBuf>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let resolved_exclude = config
            .exclude
            .iter()
            .filter_map(|ex| fs::canonicalize(ex).ok())
            .collect();
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            resolved_exclude,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root this walker starts from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// A directory is excluded by its walked path or by where it resolves,
    /// so a symlink into the store (or to one of its ancestors) is pruned too.
    fn is_excluded(&self, path: &Path) -> bool {
        if self.config.exclude.iter().any(|ex| path == ex) {
            return true;
        }
        if self.resolved_exclude.is_empty() {
            return false;
        }
        fs::canonicalize(path).is_ok_and(|resolved| self.resolved_exclude.contains(&resolved))
    }

    /// Walk the directory tree, yielding candidates.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. Calling `walk` again restarts from the root.
    pub fn walk(&self) -> impl Iterator<Item = Result<Candidate, ScanError>> + '_ {
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let excluded = entry.file_type().is_dir() && self.is_excluded(entry.path());
                if excluded {
                    log::debug!("Not descending into store: {}", entry.path().display());
                }
                !excluded
            });

        walk_dir
            .take_while(move |_| {
                let stop = self.is_shutdown_requested();
                if stop {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                }
                !stop
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if entry.depth() == 0 {
                        return None;
                    }

                    let path = entry.path();
                    let file_type = entry.file_type();

                    // Directory symlinks are followed by walkdir itself; file
                    // symlinks are never candidates.
                    if entry.path_is_symlink() {
                        if !file_type.is_dir() {
                            log::debug!("skipping {}: is a symlink", path.display());
                        }
                        return None;
                    }

                    if !file_type.is_file() {
                        if !file_type.is_dir() {
                            log::trace!("skipping {}: not a regular file", path.display());
                        }
                        return None;
                    }

                    match entry.metadata() {
                        Ok(metadata) => Some(Ok(Candidate::new(path.to_path_buf(), metadata.len()))),
                        Err(e) => Some(Err(self.handle_walk_error(e))),
                    }
                }
                Err(e) => {
                    // A dangling symlink cannot be followed; it is still a
                    // symlink and gets the same treatment as any other.
                    if let Some(path) = e.path() {
                        if e.loop_ancestor().is_none() && is_symlink(path) {
                            log::debug!("skipping {}: is a dangling symlink", path.display());
                            return None;
                        }
                    }
                    Some(Err(self.handle_walk_error(e)))
                }
            })
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if error.loop_ancestor().is_some() {
            log::debug!("Symlink loop detected: {}", path.display());
            return ScanError::Loop(path);
        }

        match error.into_io_error() {
            Some(io_err) => match io_err.kind() {
                io::ErrorKind::PermissionDenied => {
                    log::debug!("Permission denied: {}", path.display());
                    ScanError::PermissionDenied(path)
                }
                io::ErrorKind::NotFound => {
                    log::debug!("Entry vanished during walk: {}", path.display());
                    ScanError::NotFound(path)
                }
                _ => {
                    log::debug!("I/O error for {}: {}", path.display(), io_err);
                    ScanError::Io {
                        path,
                        source: io_err,
                    }
                }
            },
            None => {
                log::debug!("Walker error for {}", path.display());
                ScanError::Io {
                    path,
                    source: io::Error::other("directory walk failed"),
                }
            }
        }
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}
