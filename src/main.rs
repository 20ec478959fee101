//! posix-crawler - Concurrent POSIX Filesystem Crawler
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use posix_crawler::config::{log_directives, CliArgs, CrawlConfig};
use posix_crawler::progress::{print_header, print_summary, ProgressReporter};
use posix_crawler::walker::{CrawlCoordinator, CrawlOutcome};
use posix_crawler::ConfigError;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Traversal finished but some paths could not be crawled
const EXIT_PARTIAL: u8 = 1;

/// Invalid configuration
const EXIT_USAGE: u8 = 2;

/// Setup or output failure
const EXIT_FATAL: u8 = 3;

/// Interrupted by SIGINT
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    // Parse CLI arguments; clap exits with status 2 on usage errors
    let args = CliArgs::parse();

    setup_logging(args.verbose);

    let config = match CrawlConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => return usage_error(e),
    };

    match run(config) {
        Ok(outcome) => exit_status(&outcome),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(config: CrawlConfig) -> Result<CrawlOutcome> {
    if config.show_progress {
        print_header(
            &config.root.display().to_string(),
            config.concurrency,
            config.filter.as_str(),
        );
    }

    let coordinator = CrawlCoordinator::new(config.clone());

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let progress = config.show_progress.then(ProgressReporter::new);

    if let Some(ref p) = progress {
        p.set_status("Crawling...");
    }

    let outcome = coordinator
        .run_with_progress(std::io::stdout(), |update| {
            if let Some(ref p) = progress {
                p.update(update);
            }
        })
        .with_context(|| format!("Crawl of '{}' failed", config.root.display()))?;

    if let Some(ref p) = progress {
        if outcome.stats.completed {
            p.finish("Crawl completed");
        } else {
            p.finish("Crawl interrupted");
        }
        print_summary(&outcome.stats);
    }

    if !outcome.report.is_empty() {
        eprintln!("{}", outcome.report);
        info!(errors = outcome.report.total(), "Crawl completed with errors");
    }

    Ok(outcome)
}

fn exit_status(outcome: &CrawlOutcome) -> ExitCode {
    if !outcome.stats.completed {
        warn!("Crawl was interrupted before completion");
        ExitCode::from(EXIT_INTERRUPTED)
    } else if !outcome.report.is_empty() {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    }
}

fn usage_error(e: ConfigError) -> ExitCode {
    error!("{}", e);
    eprintln!("Error: Invalid configuration: {}", e);
    ExitCode::from(EXIT_USAGE)
}

fn setup_logging(verbose: bool) {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(log_directives(verbose, from_env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(log_directives(verbose, None)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
