// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobMatcher};

use crate::errors::Result;

/// Ordered watch globs for one subscription.
///
/// Patterns are relative to the watch root. A pattern starting with `!`
/// excludes. For a given path the *last* pattern that matches decides, so
/// `["src/**", "!src/gen/**", "src/gen/keep.rs"]` watches `src/gen/keep.rs`
/// but nothing else under `src/gen`.
#[derive(Clone)]
pub struct WatchPatterns {
    entries: Vec<PatternEntry>,
}

#[derive(Clone)]
struct PatternEntry {
    source: String,
    matcher: GlobMatcher,
    negated: bool,
}

impl fmt::Debug for WatchPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<_> = self.entries.iter().map(|e| e.source.as_str()).collect();
        f.debug_tuple("WatchPatterns").field(&sources).finish()
    }
}

impl WatchPatterns {
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let mut entries = Vec::with_capacity(globs.len());
        for raw in globs {
            let raw = raw.as_ref();
            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            entries.push(PatternEntry {
                source: raw.to_string(),
                matcher: Glob::new(pattern)?.compile_matcher(),
                negated,
            });
        }
        Ok(Self { entries })
    }

    /// True if at least one non-negated pattern exists.
    pub fn has_positive(&self) -> bool {
        self.entries.iter().any(|e| !e.negated)
    }

    /// Whether `rel_path` (relative, forward slashes) is watched.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.entries
            .iter()
            .rev()
            .find(|e| e.matcher.is_match(rel_path))
            .is_some_and(|e| !e.negated)
    }
}

/// `path` relative to `root` with forward slashes, or `None` when it is
/// outside of `root`.
///
/// Falls back to canonicalized paths when the plain prefix does not match
/// (symlinked roots, `/private/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn last_matching_pattern_wins() {
        let patterns =
            WatchPatterns::new(&["src/**/*.rs", "!src/gen/**", "src/gen/keep.rs"]).unwrap();

        assert!(patterns.matches("src/main.rs"));
        assert!(!patterns.matches("src/gen/out.rs"));
        assert!(patterns.matches("src/gen/keep.rs"));
        assert!(!patterns.matches("README.md"));
    }

    #[test]
    fn only_negations_match_nothing() {
        let patterns = WatchPatterns::new(&["!target/**"]).unwrap();
        assert!(!patterns.has_positive());
        assert!(!patterns.matches("src/lib.rs"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(WatchPatterns::new(&["src/[oops"]).is_err());
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = PathBuf::from("/project");
        assert_eq!(
            relative_str(&root, Path::new("/project/src/a.rs")).as_deref(),
            Some("src/a.rs")
        );
        assert_eq!(relative_str(&root, Path::new("/elsewhere/does-not-exist")), None);
    }
}
