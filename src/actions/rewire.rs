//! Replace a source file with a symlink into the store.
//!
//! # Overview
//!
//! The link is first created under a hidden, randomly named sibling
//! (`.<name>.XXXXXX.rustvault-link`) and then renamed over the source.
//! Rename replaces the regular file in one step, so the source path always
//! holds either the original file or the finished link, never nothing.
//!
//! # Example
//!
//! ```no_run
//! use rustvault::actions::rewire::replace_with_link;
//! use std::path::Path;
//!
//! replace_with_link(
//!     Path::new("/data/report.pdf"),
//!     Path::new("/archive/3f/3f2a..."),
//! )
//! .unwrap();
//! ```

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for rewire operations.
#[derive(Debug, Error)]
pub enum RewireError {
    /// The source path has no file name or parent directory.
    #[error("cannot rewire {0}: not a file path")]
    InvalidSource(PathBuf),

    /// The staging symlink could not be created.
    #[error("failed to create symlink {path}: {source}")]
    LinkCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The staging symlink could not be moved over the source.
    #[error("failed to replace {path} with symlink: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RewireError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::InvalidSource(p) | Self::LinkCreate { path: p, .. } | Self::Replace { path: p, .. } => p,
        }
    }
}

/// Atomically replace `source` with a symlink pointing at `target`.
///
/// On error the source is left exactly as it was and no staging link
/// remains. Nothing else in the source directory is touched.
///
/// # Errors
///
/// [`RewireError`] if the link cannot be created or swapped in.
pub fn replace_with_link(source: &Path, target: &Path) -> Result<(), RewireError> {
    let (parent, prefix) = staging_prefix(source)?;

    // The staged name is random and created exclusively, so an existing
    // file can never be taken for a leftover.
    let staged = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(STAGING_SUFFIX)
        .make_in(parent, |link| symlink_file(target, link))
        .map_err(|source_err| RewireError::LinkCreate {
            path: parent.join(&prefix),
            source: source_err,
        })?
        .into_temp_path();

    // A failed persist drops the staged path, which removes the link.
    staged.persist(source).map_err(|e| RewireError::Replace {
        path: source.to_path_buf(),
        source: e.error,
    })?;

    log::trace!("{} -> {}", source.display(), target.display());
    Ok(())
}

const STAGING_SUFFIX: &str = ".rustvault-link";

/// Parent directory and hidden name prefix (`.<name>.`) for the staged link.
fn staging_prefix(source: &Path) -> Result<(&Path, OsString), RewireError> {
    let (Some(parent), Some(name)) = (source.parent(), source.file_name()) else {
        return Err(RewireError::InvalidSource(source.to_path_buf()));
    };
    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");
    Ok((parent, prefix))
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}
