//! Human-readable output.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::archiver::{RunReport, RunStats};
use crate::journal::JournalRecord;

/// Write the per-root and total summary of a run.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(mut w: W, report: &RunReport) -> io::Result<()> {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    writeln!(w, "Archive into {}{}", report.target.display(), mode)?;

    for root in &report.roots {
        writeln!(w)?;
        writeln!(w, "{}", root.root.display())?;
        write_stats(&mut w, &root.stats)?;
    }

    if report.roots.len() > 1 {
        writeln!(w)?;
        writeln!(w, "Total")?;
        write_stats(&mut w, &report.total)?;
    }

    if report.interrupted {
        writeln!(w)?;
        writeln!(w, "Interrupted: remaining files were not processed.")?;
    }
    Ok(())
}

fn write_stats<W: Write>(w: &mut W, stats: &RunStats) -> io::Result<()> {
    writeln!(w, "  considered:    {}", stats.considered)?;
    writeln!(w, "  added:         {}", stats.added)?;
    writeln!(w, "  below minimum: {}", stats.skipped_small)?;
    writeln!(w, "  total size:    {}", ByteSize::b(stats.source_bytes))?;
    writeln!(w, "  saved:         {}", ByteSize::b(stats.saved_bytes))?;

    let faults = stats.fault_count();
    if faults > 0 {
        writeln!(
            w,
            "  skipped:       {} (traversal {}, read {}, verification {}, write {}, journal {})",
            faults,
            stats.traversal_faults,
            stats.fingerprint_faults,
            stats.verification_faults,
            stats.mutation_faults,
            stats.journal_faults
        )?;
    }
    Ok(())
}

/// Write journal records, one per line, newest first.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_journal<W: Write>(mut w: W, total: u64, records: &[JournalRecord]) -> io::Result<()> {
    for record in records {
        writeln!(
            w,
            "{}  {} -> {}",
            record.added.format("%Y-%m-%d %H:%M:%S"),
            record.source.display(),
            record.target.display()
        )?;
    }
    writeln!(w, "{} of {} record(s) shown", records.len(), total)
}
