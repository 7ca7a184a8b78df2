//! Glob patterns over root-relative, `/`-separated paths.
//!
//! Supported syntax mirrors shell globbing as used by the example layout:
//! - `**/` matches zero or more whole directories
//! - `**` at the end matches anything below
//! - `*` matches within a single path segment
//! - `?` matches one character within a segment
//!
//! Hidden entries are filtered by the filesystem scan, not here.

use examplegen_shared::{ExampleGenError, Result};
use regex::Regex;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob into an anchored regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| ExampleGenError::pattern(pattern, e.to_string()))?;
        Ok(Self { regex })
    }

    /// Whether a root-relative path matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Compile a list of globs, failing on the first invalid one.
pub fn compile_all(patterns: &[String]) -> Result<Vec<GlobPattern>> {
    patterns.iter().map(|p| GlobPattern::new(p)).collect()
}

/// Convert a glob-like pattern to regex source.
fn glob_to_regex(pattern: &str) -> String {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*/", "(?:[^/]+/)*")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]");
    format!("^{escaped}$")
}
