//! Configuration types for posix-crawler
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::walker::filter::PatternFilter;
use crate::walker::symlink::lexical_normalize;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// Maximum reasonable concurrency
pub const MAX_CONCURRENCY: usize = 1024;

/// Default number of directories visited in parallel
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default capacity of the record queue
pub const DEFAULT_RESULT_BUFFER: usize = 4096;

/// Default capacity of the error buffer
pub const DEFAULT_ERROR_BUFFER: usize = 100;

/// Log directives used when `RUST_LOG` is unset or empty
pub fn log_directives(verbose: bool, from_env: Option<&str>) -> String {
    match from_env.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives.to_string(),
        _ if verbose => "posix_crawler=debug,warn".to_string(),
        _ => "posix_crawler=info,warn".to_string(),
    }
}

/// Concurrent POSIX filesystem crawler
#[derive(Parser, Debug, Clone)]
#[command(
    name = "posix-crawler",
    version,
    about = "Crawl a directory tree and print file metadata as JSON lines",
    long_about = "Walks a directory tree with a bounded pool of workers and prints one JSON \
                  object per matching regular file on stdout.\n\n\
                  Traversal errors never stop the crawl; they are reported on stderr at the end.",
    after_help = "EXAMPLES:\n    \
        posix-crawler /data\n    \
        posix-crawler /data --pattern '\\.txt$' --concurrency 16\n    \
        posix-crawler /home --no-follow-symlinks -p > inventory.jsonl\n\n\
        EXIT STATUS:\n    \
        0 clean, 1 traversal errors, 2 usage error, 3 fatal error, 130 interrupted"
)]
pub struct CliArgs {
    /// Root directory to crawl
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Only emit files whose full path matches this regular expression
    #[arg(long, alias = "regexp", value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Maximum number of directories visited in parallel
    #[arg(
        short = 'c',
        long,
        alias = "conc",
        default_value_t = DEFAULT_CONCURRENCY as i64,
        value_name = "NUM",
        allow_negative_numbers = true
    )]
    pub concurrency: i64,

    /// Do not follow symbolic links (they are skipped)
    #[arg(long)]
    pub no_follow_symlinks: bool,

    /// Capacity of the record queue feeding the output writer
    #[arg(long, default_value_t = DEFAULT_RESULT_BUFFER, value_name = "NUM")]
    pub result_buffer: usize,

    /// Maximum number of errors kept for the final report
    #[arg(long, default_value_t = DEFAULT_ERROR_BUFFER, value_name = "NUM")]
    pub error_buffer: usize,

    /// Show a progress spinner and summary on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (log every traversal error as it happens)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Directory the crawl starts from
    pub root: PathBuf,

    /// Directories visited in parallel (always at least 1)
    pub concurrency: usize,

    /// Filter applied to regular files
    pub filter: PatternFilter,

    /// Resolve symlinks instead of skipping them
    pub follow_symlinks: bool,

    /// Record queue capacity
    pub result_buffer: usize,

    /// Error buffer capacity
    pub error_buffer: usize,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl CrawlConfig {
    /// Configuration with defaults for everything but the root.
    ///
    /// The root is cleaned lexically, so `./data/` becomes `data`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: lexical_normalize(&root.into()),
            concurrency: DEFAULT_CONCURRENCY,
            filter: PatternFilter::match_all(),
            follow_symlinks: true,
            result_buffer: DEFAULT_RESULT_BUFFER,
            error_buffer: DEFAULT_ERROR_BUFFER,
            show_progress: false,
            verbose: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.root.as_os_str().is_empty() {
            return Err(ConfigError::MissingRoot);
        }

        let concurrency = clamp_concurrency(args.concurrency)?;

        if args.result_buffer == 0 {
            return Err(ConfigError::InvalidBufferSize {
                name: "result buffer",
                size: args.result_buffer,
            });
        }
        if args.error_buffer == 0 {
            return Err(ConfigError::InvalidBufferSize {
                name: "error buffer",
                size: args.error_buffer,
            });
        }

        let filter = PatternFilter::from_option(args.pattern.as_deref())?;

        Ok(Self {
            root: lexical_normalize(&args.root),
            concurrency,
            filter,
            follow_symlinks: !args.no_follow_symlinks,
            result_buffer: args.result_buffer,
            error_buffer: args.error_buffer,
            show_progress: args.progress,
            verbose: args.verbose,
        })
    }

    /// Set the pattern filter
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.filter = PatternFilter::new(pattern)?;
        Ok(self)
    }

    /// Set the concurrency bound; zero is raised to one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Enable or disable symlink following
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the error buffer capacity; zero is raised to one
    pub fn with_error_buffer(mut self, capacity: usize) -> Self {
        self.error_buffer = capacity.max(1);
        self
    }

    /// Set the record queue capacity; zero is raised to one
    pub fn with_result_buffer(mut self, capacity: usize) -> Self {
        self.result_buffer = capacity.max(1);
        self
    }
}

/// Values below one become one; values above the maximum are rejected
fn clamp_concurrency(requested: i64) -> Result<usize, ConfigError> {
    if requested < 1 {
        warn!(requested, "Concurrency must be at least 1, using 1");
        return Ok(1);
    }
    if requested as u64 > MAX_CONCURRENCY as u64 {
        return Err(ConfigError::InvalidConcurrency {
            count: requested,
            max: MAX_CONCURRENCY,
        });
    }
    Ok(requested as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("posix-crawler").chain(args.iter().copied()))
    }

    #[test]
    fn test_root_is_required() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::from_args(parse(&["/data"]).unwrap()).unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.follow_symlinks);
        assert_eq!(config.filter.as_str(), None);
        assert_eq!(config.result_buffer, DEFAULT_RESULT_BUFFER);
        assert_eq!(config.error_buffer, DEFAULT_ERROR_BUFFER);
    }

    #[test]
    fn test_flags_and_aliases() {
        let args = parse(&["/data", "--regexp", r"\.txt$", "--conc", "16", "--no-follow-symlinks"]).unwrap();
        let config = CrawlConfig::from_args(args).unwrap();

        assert_eq!(config.concurrency, 16);
        assert!(!config.follow_symlinks);
        assert!(config.filter.is_match(Path::new("/data/a.txt")));
        assert!(!config.filter.is_match(Path::new("/data/a.log")));
    }

    #[test]
    fn test_non_positive_concurrency_clamped() {
        for value in ["0", "-3"] {
            let args = parse(&["/data", "--concurrency", value]).unwrap();
            assert_eq!(CrawlConfig::from_args(args).unwrap().concurrency, 1);
        }
    }

    #[test]
    fn test_excessive_concurrency_rejected() {
        let args = parse(&["/data", "-c", "100000"]).unwrap();
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidConcurrency { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let args = parse(&["/data", "--pattern", "[a-"]).unwrap();
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_zero_buffers_rejected() {
        let args = parse(&["/data", "--error-buffer", "0"]).unwrap();
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidBufferSize { .. })
        ));
    }

    #[test]
    fn test_root_is_cleaned() {
        assert_eq!(CrawlConfig::new("./data/../srv/").root, PathBuf::from("srv"));
        assert_eq!(CrawlConfig::new("./").root, PathBuf::from("."));

        let config = CrawlConfig::from_args(parse(&["/data/./logs/"]).unwrap()).unwrap();
        assert_eq!(config.root, PathBuf::from("/data/logs"));
    }

    #[test]
    fn test_log_directives() {
        assert_eq!(log_directives(false, None), "posix_crawler=info,warn");
        assert_eq!(log_directives(true, None), "posix_crawler=debug,warn");
        assert_eq!(log_directives(true, Some("  ")), "posix_crawler=debug,warn");
        assert_eq!(log_directives(false, Some("posix_crawler=trace")), "posix_crawler=trace");
    }

    #[test]
    fn test_builder() {
        let config = CrawlConfig::new("/srv")
            .with_concurrency(0)
            .with_follow_symlinks(false)
            .with_pattern("x")
            .unwrap();
        assert_eq!(config.concurrency, 1);
        assert!(!config.follow_symlinks);
        assert_eq!(config.filter.as_str(), Some("x"));
    }
}
