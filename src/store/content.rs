//! Placement decisions and transfers for the content store.
//!
//! # Overview
//!
//! [`ContentStore::classify`] decides whether a fingerprinted file is a
//! duplicate of an existing canonical entry or its first occurrence.
//! [`ContentStore::place`] commits a first occurrence: the entry is staged
//! and published without clobbering anything, then made read-only.
//! [`ContentStore::abandon`] undoes a placement when the caller could not
//! finish rewiring the source.
//!
//! # Example
//!
//! ```no_run
//! use rustvault::scanner::Fingerprinter;
//! use rustvault::store::{ContentStore, Placement, StoreConfig};
//! use std::path::Path;
//!
//! let mut store = ContentStore::open(Path::new("/archive"), StoreConfig::default()).unwrap();
//! let source = Path::new("/data/report.pdf");
//! let fp = Fingerprinter::new().fingerprint(source).unwrap();
//! match store.classify(&fp).unwrap() {
//!     Placement::Duplicate { target } => println!("already stored at {}", target.display()),
//!     Placement::FirstOccurrence { .. } => {
//!         let placed = store.place(source, &fp).unwrap();
//!         println!("stored at {}", placed.target.display());
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::fs::{self, File, Permissions};
use std::io;
use std::path::{Path, PathBuf};

use crate::scanner::hasher::read_prefix;
use crate::scanner::{digest_to_hex, Digest, Fingerprint};

use super::lock::StoreLock;
use super::{StoreConfig, StoreError, TransferMode};

/// Outcome of [`ContentStore::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A verified canonical entry exists (or, in a dry run, would exist).
    Duplicate { target: PathBuf },
    /// No entry exists yet for this digest.
    FirstOccurrence { target: PathBuf },
}

impl Placement {
    /// Canonical path for the content.
    #[must_use]
    pub fn target(&self) -> &Path {
        match self {
            Self::Duplicate { target } | Self::FirstOccurrence { target } => target,
        }
    }

    /// Whether the content already has a canonical entry.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// A canonical entry freshly created by [`ContentStore::place`].
#[derive(Debug, Clone)]
pub struct Placed {
    /// Canonical path of the new entry
    pub target: PathBuf,
    /// The entry is a hard link to the source, not a copy
    pub shares_source_inode: bool,
    /// Permissions the source had before placement
    original_permissions: Permissions,
}

/// Content-addressed store rooted at a directory.
#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
    config: StoreConfig,
    /// Digests first seen during this dry run
    shadow: HashSet<Digest>,
    _lock: Option<StoreLock>,
}

impl ContentStore {
    /// Open the store at `root`.
    ///
    /// In real mode the root is created if needed, probed for write access
    /// and locked for this process. In dry-run mode nothing is created and
    /// no lock is taken.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the whole run.
    pub fn open(root: &Path, config: StoreConfig) -> Result<Self, StoreError> {
        let (root, lock) = if config.dry_run {
            let root = if root.exists() {
                fs::canonicalize(root)
            } else {
                std::path::absolute(root)
            }
            .map_err(|source| StoreError::CreateRoot {
                path: root.to_path_buf(),
                source,
            })?;
            (root, None)
        } else {
            fs::create_dir_all(root).map_err(|source| StoreError::CreateRoot {
                path: root.to_path_buf(),
                source,
            })?;
            let root = fs::canonicalize(root).map_err(|source| StoreError::CreateRoot {
                path: root.to_path_buf(),
                source,
            })?;
            probe_writable(&root)?;
            let lock = StoreLock::acquire(&root)?;
            (root, Some(lock))
        };

        log::debug!(
            "Opened store {} (transfer: {}, verify prefix: {}, dry run: {})",
            root.display(),
            config.transfer_mode,
            config.verify_prefix,
            config.dry_run
        );

        Ok(Self {
            root,
            config,
            shadow: HashSet::new(),
            _lock: lock,
        })
    }

    /// Absolute, resolved store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Canonical path for a digest: `<root>/<hex[..2]>/<hex>`.
    #[must_use]
    pub fn canonical_path(&self, digest: &Digest) -> PathBuf {
        let hex = digest_to_hex(digest);
        self.root.join(&hex[..2]).join(&hex)
    }

    /// Decide whether `fp` is a duplicate or a first occurrence.
    ///
    /// In dry-run mode a digest seen earlier in the same run also counts
    /// as a duplicate, and a first occurrence is remembered for later.
    ///
    /// # Errors
    ///
    /// Integrity faults when an existing entry fails verification, or I/O
    /// errors while inspecting it. Nothing is modified either way.
    pub fn classify(&mut self, fp: &Fingerprint) -> Result<Placement, StoreError> {
        let target = self.canonical_path(&fp.digest);

        match fs::metadata(&target) {
            Ok(metadata) => {
                self.verify_existing(&target, &metadata, fp)?;
                return Ok(Placement::Duplicate { target });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&target, e)),
        }

        if self.config.dry_run && !self.shadow.insert(fp.digest) {
            return Ok(Placement::Duplicate { target });
        }

        Ok(Placement::FirstOccurrence { target })
    }

    /// Size and first-block check against an existing entry.
    fn verify_existing(
        &self,
        target: &Path,
        metadata: &fs::Metadata,
        fp: &Fingerprint,
    ) -> Result<(), StoreError> {
        if !metadata.is_file() {
            return Err(StoreError::NotAFile(target.to_path_buf()));
        }
        if metadata.len() != fp.size {
            return Err(StoreError::SizeMismatch {
                target: target.to_path_buf(),
                expected: fp.size,
                found: metadata.len(),
            });
        }
        if self.config.verify_prefix {
            let stored = read_prefix(target, fp.first_block.len())
                .map_err(|e| StoreError::io(target, e))?;
            if stored != fp.first_block {
                return Err(StoreError::PrefixMismatch {
                    target: target.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Create the canonical entry for a first occurrence.
    ///
    /// The source is left in place; the caller replaces it with a link and
    /// calls [`Self::abandon`] if that fails. The entry is never visible
    /// at its canonical path in a partially written state.
    ///
    /// # Errors
    ///
    /// Mutation faults (directory creation, transfer, permission change).
    /// On error no entry is left behind.
    pub fn place(&self, source: &Path, fp: &Fingerprint) -> Result<Placed, StoreError> {
        if self.config.dry_run {
            return Err(StoreError::DryRun);
        }

        let target = self.canonical_path(&fp.digest);
        let shard = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(shard).map_err(|e| StoreError::io(shard, e))?;

        let source_meta = fs::metadata(source).map_err(|e| StoreError::io(source, e))?;
        if !matches_fingerprint(&source_meta, fp) {
            return Err(StoreError::SourceModified(source.to_path_buf()));
        }
        let original_permissions = source_meta.permissions();

        let linked = self.config.transfer_mode == TransferMode::Move
            && !has_other_links(&source_meta)
            && self.try_hard_link(source, &target)?;

        if !linked {
            copy_into_place(source, shard, &target, fp.size)?;
        }

        let placed = Placed {
            target,
            shares_source_inode: linked,
            original_permissions,
        };

        if let Err(e) = make_read_only(&placed.target) {
            self.abandon(&placed);
            return Err(StoreError::io(&placed.target, e));
        }

        // A linked entry shares the source inode and a copy may have raced a
        // writer, so the source is checked again once the entry exists.
        let still_matches = fs::metadata(source).is_ok_and(|m| matches_fingerprint(&m, fp));
        if !still_matches {
            self.abandon(&placed);
            return Err(StoreError::SourceModified(source.to_path_buf()));
        }

        log::debug!(
            "Placed {} ({})",
            placed.target.display(),
            if linked { "linked" } else { "copied" }
        );
        Ok(placed)
    }

    /// Refuse a candidate that is the canonical entry `target` itself.
    ///
    /// A target that does not exist (a dry-run first occurrence) cannot be
    /// an alias.
    ///
    /// # Errors
    ///
    /// [`StoreError::AliasOfEntry`] when both paths name the same file, or
    /// an I/O error while inspecting them.
    pub fn reject_alias(&self, source: &Path, target: &Path) -> Result<(), StoreError> {
        match same_file(source, target) {
            Ok(true) => Err(StoreError::AliasOfEntry {
                path: source.to_path_buf(),
                target: target.to_path_buf(),
            }),
            Ok(false) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(source, e)),
        }
    }

    /// Returns `Ok(false)` when hard links are not possible here and a copy
    /// should be made instead.
    fn try_hard_link(&self, source: &Path, target: &Path) -> Result<bool, StoreError> {
        match fs::hard_link(source, target) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(target.to_path_buf()))
            }
            Err(e) => {
                log::debug!(
                    "Hard link {} -> {} failed ({}), copying instead",
                    source.display(),
                    target.display(),
                    e
                );
                Ok(false)
            }
        }
    }

    /// Remove an entry created by [`Self::place`] in this run.
    ///
    /// Permissions are restored first so a shared inode goes back to the
    /// source exactly as it was. Failures are logged; there is nothing
    /// further to undo.
    pub fn abandon(&self, placed: &Placed) {
        if let Err(e) = fs::set_permissions(&placed.target, placed.original_permissions.clone()) {
            log::error!(
                "Failed to restore permissions on {}: {}",
                placed.target.display(),
                e
            );
        }
        match fs::remove_file(&placed.target) {
            Ok(()) => log::debug!("Rolled back {}", placed.target.display()),
            Err(e) => log::error!(
                "Failed to roll back canonical entry {}: {}",
                placed.target.display(),
                e
            ),
        }
    }
}

/// Stream `source` into a temporary file in `shard`, then publish it at
/// `target` only if nothing is there yet.
fn copy_into_place(
    source: &Path,
    shard: &Path,
    target: &Path,
    expected: u64,
) -> Result<(), StoreError> {
    let mut staged = tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(shard)
        .map_err(|e| StoreError::io(shard, e))?;

    let mut input = File::open(source).map_err(|e| StoreError::io(source, e))?;
    let copied = io::copy(&mut input, staged.as_file_mut()).map_err(|e| StoreError::io(source, e))?;
    if copied != expected {
        return Err(StoreError::SourceChanged {
            path: source.to_path_buf(),
            expected,
            found: copied,
        });
    }
    staged
        .as_file()
        .sync_all()
        .map_err(|e| StoreError::io(staged.path(), e))?;

    staged.persist_noclobber(target).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            StoreError::AlreadyExists(target.to_path_buf())
        } else {
            StoreError::io(target, e.error)
        }
    })?;
    Ok(())
}

/// Probe write access by creating and dropping a temporary file.
fn probe_writable(root: &Path) -> Result<(), StoreError> {
    tempfile::NamedTempFile::new_in(root)
        .map(drop)
        .map_err(|source| StoreError::NotWritable {
            path: root.to_path_buf(),
            source,
        })
}

/// Strip every write bit (owner, group, other).
pub(crate) fn make_read_only(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() & !0o222);
    }
    #[cfg(not(unix))]
    {
        perms.set_readonly(true);
    }
    fs::set_permissions(path, perms)
}

/// Size and modification time still match what was fingerprinted.
fn matches_fingerprint(metadata: &fs::Metadata, fp: &Fingerprint) -> bool {
    metadata.len() == fp.size
        && (fp.modified.is_none() || metadata.modified().ok() == fp.modified)
}

/// Whether two paths name the same file, following symlinks.
#[cfg(unix)]
pub(crate) fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let (a, b) = (fs::metadata(a)?, fs::metadata(b)?);
    Ok(a.dev() == b.dev() && a.ino() == b.ino())
}

#[cfg(not(unix))]
pub(crate) fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}

/// A source with extra hard links must not have its inode re-permissioned.
#[cfg(unix)]
fn has_other_links(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink() > 1
}

#[cfg(not(unix))]
fn has_other_links(_metadata: &fs::Metadata) -> bool {
    false
}
