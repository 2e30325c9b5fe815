//! RustVault - deduplicating content-addressed archiver
//!
//! Moves files from one or more source trees into a store keyed by their
//! SHA-256 digest, replacing each original with a symbolic link to its
//! canonical copy. Identical content is stored once; every relocation is
//! journaled in SQLite.

pub mod actions;
pub mod archiver;
pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::archiver::Archiver;
use crate::cli::{ArchiveArgs, Cli, Commands, JournalArgs, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::journal::Journal;
use crate::output::{JsonJournal, JsonReport};
use crate::progress::Progress;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for fatal conditions: bad configuration, an unusable
/// store or journal, a missing source root. Per-file faults are not errors;
/// they surface as [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Archive(args) => run_archive(args, &config, cli.quiet),
        Commands::Journal(args) => run_journal(&args, &config),
    }
}

fn run_archive(args: ArchiveArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let mut archive_config = config.archive_config().with_dry_run(args.dry_run);
    if let Some(min_size) = args.min_size {
        archive_config = archive_config.with_min_size(min_size);
    }
    if let Some(mode) = args.transfer_mode {
        archive_config = archive_config.with_transfer_mode(mode);
    }
    if args.no_verify {
        archive_config = archive_config.with_verify_prefix(false);
    }
    if let Some(secs) = args.progress_interval {
        archive_config =
            archive_config.with_progress_interval(std::time::Duration::from_secs(secs));
    }

    let handler = signal::install_handler()?;
    let show_progress = !quiet && args.output == OutputFormat::Text;

    let mut archiver = Archiver::open(&args.target, archive_config)
        .with_context(|| format!("cannot open store at {}", args.target.display()))?
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(Arc::new(Progress::new(!show_progress)));

    let report = archiver.run(&args.sources)?;
    archiver.finish().context("failed to close the journal")?;

    let exit_code = ExitCode::from_report(&report);
    let stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Text => output::text::write_report(stdout, &report)?,
        OutputFormat::Json => JsonReport::new(&report, exit_code).write_to(stdout)?,
    }

    Ok(exit_code)
}

fn run_journal(args: &JournalArgs, config: &Config) -> Result<ExitCode> {
    let path = args.target.join(&config.journal_file);
    let journal = Journal::open_read_only(&path)
        .with_context(|| format!("cannot read journal {}", path.display()))?;

    let total = journal.count()?;
    let records = journal.recent(args.limit)?;

    let stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Text => output::text::write_journal(stdout, total, &records)?,
        OutputFormat::Json => JsonJournal::new(total, &records).write_to(stdout)?,
    }

    Ok(ExitCode::Success)
}
