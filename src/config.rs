//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. a TOML file (the platform config path, or `--config`)
//! 3. environment variables prefixed `RUSTVAULT_`
//! 4. command-line flags, applied by the caller
//!
//! ```toml
//! min_size = 4096
//! transfer_mode = "copy"
//! verify_prefix = true
//! progress_interval_secs = 30
//! journal_file = "db.sqlite"
//! ```

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archiver::{
    ArchiveConfig, DEFAULT_JOURNAL_FILE, DEFAULT_MIN_SIZE, DEFAULT_PROGRESS_INTERVAL,
};
use crate::store::TransferMode;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RUSTVAULT_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files smaller than this many bytes are left alone.
    pub min_size: u64,
    /// How new store entries are created from their source.
    pub transfer_mode: TransferMode,
    /// Compare first blocks before linking to an existing entry.
    pub verify_prefix: bool,
    /// Seconds between progress log lines.
    pub progress_interval_secs: u64,
    /// Journal file name inside the store root.
    pub journal_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            transfer_mode: TransferMode::default(),
            verify_prefix: true,
            progress_interval_secs: DEFAULT_PROGRESS_INTERVAL.as_secs(),
            journal_file: DEFAULT_JOURNAL_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// With `path` set the file must exist; otherwise the platform config
    /// file is used when present and silently skipped when not.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any layer fails to
    /// parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                if !p.is_file() {
                    anyhow::bail!("config file {} does not exist", p.display());
                }
                Some(p.to_path_buf())
            }
            None => Self::config_path().ok().filter(|p| p.is_file()),
        };

        if let Some(f) = &file {
            log::debug!("Loading configuration from {}", f.display());
        }

        Self::figment(file.as_deref())
            .extract()
            .context("invalid configuration")
    }

    /// The layered provider chain, without command-line overrides.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(f) = file {
            figment = figment.merge(Toml::file(f));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Write the configuration as TOML to the platform config path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined or written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "rustvault", "rustvault")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Pipeline settings for these values.
    #[must_use]
    pub fn archive_config(&self) -> ArchiveConfig {
        ArchiveConfig::default()
            .with_min_size(self.min_size)
            .with_transfer_mode(self.transfer_mode)
            .with_verify_prefix(self.verify_prefix)
            .with_progress_interval(Duration::from_secs(self.progress_interval_secs))
            .with_journal_file(self.journal_file.clone())
    }
}
