//! Command-line interface definitions for RustVault.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, config file, error format) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Archive two trees into one store
//! rustvault archive --source ~/photos --source ~/backup/photos --target /vault
//!
//! # See what would happen without touching anything
//! rustvault archive --source ~/photos --target /vault --dry-run
//!
//! # Only consider files of at least 1 MiB, copying instead of moving
//! rustvault archive --source ~/data --target /vault --min-size 1MiB --transfer copy
//!
//! # Show the last 20 relocations
//! rustvault journal --target /vault --limit 20
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::store::TransferMode;

/// Deduplicating content-addressed archiver.
///
/// RustVault moves files into a store keyed by their SHA-256 digest and
/// leaves a symbolic link behind, so every distinct content is kept once.
#[derive(Debug, Parser)]
#[command(name = "rustvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    ///
    /// If not specified, the platform config directory is searched.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for RustVault.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Archive source trees into a content-addressed store
    Archive(ArchiveArgs),
    /// List recent relocations recorded in a store's journal
    Journal(JournalArgs),
}

/// Arguments for the archive subcommand.
#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Source directory to archive (repeat for several, processed in order)
    #[arg(short, long = "source", value_name = "PATH", required = true)]
    pub sources: Vec<PathBuf>,

    /// Store root; created if missing
    #[arg(short, long, value_name = "PATH")]
    pub target: PathBuf,

    /// Report what would happen without modifying anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Minimum file size to archive (e.g., 1024, 4KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// How first occurrences are relocated into the store
    #[arg(long = "transfer", value_enum, value_name = "MODE")]
    pub transfer_mode: Option<TransferMode>,

    /// Link to existing entries without comparing their first block
    #[arg(long)]
    pub no_verify: bool,

    /// Seconds between progress log lines
    #[arg(long, value_name = "SECS")]
    pub progress_interval: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the journal subcommand.
#[derive(Debug, Args)]
pub struct JournalArgs {
    /// Store root whose journal to read
    #[arg(short, long, value_name = "PATH")]
    pub target: PathBuf,

    /// Maximum number of records, newest first
    #[arg(short, long, value_name = "N", default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

/// Parse a human-readable size string into bytes.
///
/// Supports the following formats:
/// - Plain numbers: "1024" (bytes)
/// - With suffix: "1KB", "1K", "1KiB" (case insensitive)
/// - Fractional: "1.5MB"
///
/// Decimal suffixes (KB, MB, ...) use powers of 1000; binary suffixes
/// (KiB, MiB, ...) use powers of 1024.
///
/// # Errors
///
/// Returns an error string if the input is empty, not a number, negative,
/// or carries an unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
