//! Progress reporting for the crawler
//!
//! Provides a live spinner using indicatif. Everything here goes to stderr;
//! stdout is reserved for records.

use crate::walker::{CrawlProgress, CrawlStats};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays crawl status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &CrawlProgress) {
        let msg = format!(
            "Dirs: {} | Files: {} | Size: {} | Rate: {:.0}/s | Pending: {} | Active: {}/{} | Errors: {}",
            format_number(progress.dirs),
            format_number(progress.files),
            format_size(progress.bytes, BINARY),
            progress.files_per_second(),
            progress.pending,
            progress.active,
            progress.concurrency,
            format_number(progress.errors),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the crawl to stderr
pub fn print_summary(stats: &CrawlStats) {
    let duration_secs = stats.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.files as f64 / duration_secs
    } else {
        0.0
    };

    let title = if stats.completed {
        style("Crawl Complete").green().bold()
    } else {
        style("Crawl Interrupted").yellow().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Directories:").bold(), format_number(stats.dirs));
    eprintln!("  {} {}", style("Files:").bold(), format_number(stats.records_written));
    eprintln!("  {} {}", style("Total Size:").bold(), format_size(stats.bytes, BINARY));
    if stats.symlinks > 0 {
        eprintln!("  {} {}", style("Symlinks:").bold(), format_number(stats.symlinks));
    }
    eprintln!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    eprintln!("  {} {}", style("Peak Concurrency:").bold(), stats.peak_concurrency);
    if stats.errors > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(stats.errors)
        );
    }
    eprintln!();
}

/// Print a header at the start of the crawl to stderr
pub fn print_header(root: &str, concurrency: usize, pattern: Option<&str>) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("posix-crawler").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Root:").bold(), root);
    eprintln!("  {} {}", style("Concurrency:").bold(), concurrency);
    eprintln!("  {} {}", style("Pattern:").bold(), pattern.unwrap_or("(all files)"));
    eprintln!();
}
