//! Path pattern filter
//!
//! An optional compiled regular expression tested against the full candidate
//! path. No pattern means every regular file matches.

use crate::error::ConfigError;
use regex::Regex;
use std::path::Path;

/// Optional path filter applied to regular files
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    pattern: Option<Regex>,
}

impl PatternFilter {
    /// Filter that accepts every path
    pub fn match_all() -> Self {
        Self { pattern: None }
    }

    /// Compile a pattern. Blank or whitespace-only input means no filter.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        if pattern.trim().is_empty() {
            return Ok(Self::match_all());
        }

        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: Some(regex),
        })
    }

    /// Compile an optional pattern
    pub fn from_option(pattern: Option<&str>) -> Result<Self, ConfigError> {
        match pattern {
            Some(p) => Self::new(p),
            None => Ok(Self::match_all()),
        }
    }

    /// Check whether a path should be emitted
    pub fn is_match(&self, path: &Path) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(&path.to_string_lossy()),
            None => true,
        }
    }

    /// The configured pattern source, if any
    pub fn as_str(&self) -> Option<&str> {
        self.pattern.as_ref().map(|re| re.as_str())
    }
}
