//! Advisory single-writer lock on a store root.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;

use super::StoreError;

/// Name of the lock file inside the store root.
pub const LOCK_FILE: &str = ".rustvault.lock";

/// Exclusive lock held for the lifetime of a real archive run.
///
/// The lock is released when the value is dropped, including on panic
/// unwinding and early returns. The lock file itself is left in place.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Try to take the lock without waiting.
    ///
    /// # Errors
    ///
    /// [`StoreError::Locked`] if another holder exists,
    /// [`StoreError::NotWritable`] if the lock file cannot be opened.
    pub fn acquire(root: &Path) -> Result<Self, StoreError> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::NotWritable {
                path: path.clone(),
                source,
            })?;

        if FileExt::try_lock_exclusive(&file).is_err() {
            return Err(StoreError::Locked(root.to_path_buf()));
        }

        log::debug!("Acquired store lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release store lock {}: {}", self.path.display(), e);
        }
    }
}
