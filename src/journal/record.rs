//! Journal record definitions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed relocation: `source` now links to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Original file location, now a symlink
    pub source: PathBuf,
    /// Canonical store entry the symlink points to
    pub target: PathBuf,
    /// Wall-clock commit time
    pub added: DateTime<Utc>,
}

impl JournalRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn now(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            added: Utc::now(),
        }
    }
}
