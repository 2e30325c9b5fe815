//! Progress reporting.
//!
//! Two independent mechanisms:
//!
//! - [`ProgressTicker`] logs the running counters at a fixed wall-clock
//!   interval, so log volume does not depend on tree size.
//! - [`ProgressCallback`] receives per-file updates; [`Progress`] renders
//!   them as an indicatif spinner for interactive terminals.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::archiver::RunStats;

/// Progress callback for archive runs.
pub trait ProgressCallback: Send + Sync {
    /// Called before the walk of a source root starts.
    fn on_root_start(&self, root: &Path);

    /// Called after each candidate has been handled.
    ///
    /// # Arguments
    ///
    /// * `path` - Candidate just processed
    /// * `stats` - Counters for the current root so far
    fn on_file(&self, path: &Path, stats: &RunStats);

    /// Called when a source root has been drained.
    fn on_root_end(&self, root: &Path, stats: &RunStats);
}

/// Logs counters whenever at least `interval` has passed since the last line.
#[derive(Debug)]
pub struct ProgressTicker {
    interval: Duration,
    last: Instant,
}

impl ProgressTicker {
    /// Create a ticker; the first line is due one interval from now.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    /// Whether a line is due at `now`. Resets the clock when it is.
    pub fn due(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// Log `stats` if the interval has elapsed.
    pub fn tick(&mut self, stats: &RunStats) {
        if self.due(Instant::now()) {
            log::info!(
                "added {} files, considered {} files, total size {} bytes, saved size {} bytes",
                stats.added,
                stats.considered,
                stats.source_bytes,
                stats.saved_bytes
            );
        }
    }
}

/// Terminal spinner showing live counters.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustvault::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }
}

impl ProgressCallback for Progress {
    fn on_root_start(&self, root: &Path) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::style());
        pb.set_prefix(truncate_path(&root.to_string_lossy(), 30));
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_file(&self, path: &Path, stats: &RunStats) {
        if self.quiet {
            return;
        }
        if let Ok(bar) = self.bar.lock() {
            if let Some(pb) = bar.as_ref() {
                pb.set_message(format!(
                    "{} added / {} considered, saved {} - {}",
                    stats.added,
                    stats.considered,
                    ByteSize::b(stats.saved_bytes),
                    truncate_path(&path.to_string_lossy(), 30)
                ));
            }
        }
    }

    fn on_root_end(&self, _root: &Path, stats: &RunStats) {
        if self.quiet {
            return;
        }
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_with_message(stats.summary());
            }
        }
    }
}

/// Truncate a path for display in the spinner.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = chars[chars.len().saturating_sub(keep)..].iter().collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
