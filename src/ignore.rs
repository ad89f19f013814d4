// src/ignore.rs

//! Ordered glob patterns with negation and basename fallback (spec §4.2).
//!
//! `IgnoreSet::matches` walks patterns in registration order; the last
//! pattern that matches decides the outcome, so a later `!keep-me` can
//! un-ignore something an earlier broad pattern caught.

use glob::Pattern;
use std::path::Path;

#[derive(Debug, Clone, thiserror::Error)]
pub enum IgnoreError {
    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    raw: String,
    pattern: Pattern,
    negated: bool,
}

/// An ordered list of compiled ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<CompiledPattern>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append patterns in order. A pattern prefixed `!` is a
    /// negation. An invalid pattern is reported but does not prevent
    /// later valid patterns from being compiled.
    pub fn add_patterns<I, S>(&mut self, patterns: I) -> Result<(), Vec<IgnoreError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut errors = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref();
            let (negated, glob_str) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            match Pattern::new(glob_str) {
                Ok(pattern) => self.patterns.push(CompiledPattern {
                    raw: raw.to_string(),
                    pattern,
                    negated,
                }),
                Err(e) => errors.push(IgnoreError::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Raw pattern strings in registration order, for persisting into the
    /// manifest's `ignored.patterns` set.
    pub fn raw_patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.raw.clone()).collect()
    }

    /// Evaluate `path` (relative to the package root, '/'-separated)
    /// against every pattern in order; the last match wins.
    pub fn matches(&self, path: &Path) -> bool {
        let full = path.to_string_lossy().replace('\\', "/");
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut ignored = false;
        for compiled in &self.patterns {
            if compiled.pattern.matches(&full) || compiled.pattern.matches(&basename) {
                ignored = !compiled.negated;
            }
        }
        ignored
    }

    /// The default pattern set: version control, OS metadata, and
    /// security-sensitive files. Callers may extend but the safety-rails
    /// contract (spec §6) expects these always present unless a caller
    /// explicitly opts out.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.add_patterns(default_patterns()).expect("default patterns are valid globs");
        set
    }
}

/// Built-in ignore patterns: VCS directories, OS metadata files, and
/// credential material that should never be symlinked into place blindly.
pub fn default_patterns() -> Vec<&'static str> {
    vec![
        ".git",
        ".git/**",
        ".svn",
        ".hg",
        ".DS_Store",
        "Thumbs.db",
        "desktop.ini",
        "id_rsa",
        "id_dsa",
        "id_ecdsa",
        "id_ed25519",
        "*.pem",
        ".gnupg",
        ".gnupg/**",
        ".netrc",
        ".pgpass",
        ".aws/credentials",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn last_match_wins_with_negation() {
        let mut set = IgnoreSet::new();
        set.add_patterns(["*.log", "!keep.log"]).unwrap();
        assert!(set.matches(&PathBuf::from("debug.log")));
        assert!(!set.matches(&PathBuf::from("keep.log")));
    }

    #[test]
    fn matches_basename_even_with_deep_path() {
        let mut set = IgnoreSet::new();
        set.add_patterns([".DS_Store"]).unwrap();
        assert!(set.matches(&PathBuf::from("a/b/.DS_Store")));
    }

    #[test]
    fn full_path_pattern_does_not_match_unrelated_basename() {
        let mut set = IgnoreSet::new();
        set.add_patterns(["a/b/*.txt"]).unwrap();
        assert!(!set.matches(&PathBuf::from("c/d/x.txt")));
        assert!(set.matches(&PathBuf::from("a/b/x.txt")));
    }

    #[test]
    fn invalid_pattern_does_not_block_valid_ones() {
        let mut set = IgnoreSet::new();
        let result = set.add_patterns(["[", "*.bak"]);
        assert!(result.is_err());
        assert!(set.matches(&PathBuf::from("x.bak")));
    }

    #[test]
    fn default_patterns_catch_ssh_keys_and_vcs_dirs() {
        let set = IgnoreSet::with_defaults();
        assert!(set.matches(&PathBuf::from("dot-ssh/id_rsa")));
        assert!(set.matches(&PathBuf::from(".git/HEAD")));
    }
}
