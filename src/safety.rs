// src/safety.rs

//! Safety rails (spec §4.3, §4.5, §4.11, §6): the self-management guard
//! and the sensitivity/triage classification table used by Doctor.

use crate::error::{Error, Result};
use glob::Pattern;
use std::env;
use std::path::{Path, PathBuf};

/// The process's own configuration and data directories, computed from
/// `XDG_CONFIG_HOME`/`XDG_DATA_HOME` with the conventional fallbacks.
/// Desired links/directories under either are rejected outright (spec
/// §4.5's self-management guard) so a Manage run can never symlink over
/// or delete the tool's own state.
pub struct ProtectedPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ProtectedPaths {
    pub fn discover() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| "/root".to_string());
        let config_dir = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(&home).join(".config"))
            .join("dotkeep");
        let data_dir = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(&home).join(".local/share"))
            .join("dotkeep");
        Self { config_dir, data_dir }
    }

    pub fn new(config_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    fn protects(&self, path: &Path) -> Option<&Path> {
        if path.starts_with(&self.config_dir) {
            Some(&self.config_dir)
        } else if path.starts_with(&self.data_dir) {
            Some(&self.data_dir)
        } else {
            None
        }
    }

    /// Reject `desired` (a link or directory target) if it equals or
    /// descends from a protected path, or if a protected path descends
    /// from it (the desired path would replace a directory that contains
    /// protected state).
    pub fn guard(&self, package: &str, desired: &Path) -> Result<()> {
        if let Some(protected) = self.protects(desired) {
            return Err(Error::SelfManagement {
                package: package.to_string(),
                protected_path: protected.to_path_buf(),
            });
        }
        for protected in [&self.config_dir, &self.data_dir] {
            if protected.starts_with(desired) && protected != desired {
                return Err(Error::SelfManagement {
                    package: package.to_string(),
                    protected_path: protected.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Confidence a Triage classification assigns to a category match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A named group of glob patterns used by Doctor's orphan Triage to
/// bucket unmanaged links (package-manager binaries, toolchain shims,
/// IDE extensions, ...) so a user can ignore a whole category at once.
pub struct TriageCategory {
    pub name: &'static str,
    pub confidence: Confidence,
    patterns: Vec<Pattern>,
    globs: &'static [&'static str],
}

impl TriageCategory {
    fn new(name: &'static str, confidence: Confidence, globs: &'static [&'static str]) -> Self {
        Self {
            name,
            confidence,
            patterns: globs.iter().filter_map(|g| Pattern::new(g).ok()).collect(),
            globs,
        }
    }

    pub fn matches(&self, basename: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(basename))
    }

    /// The original glob strings, for persisting a whole-category ignore
    /// decision into the manifest's ignored-pattern set.
    pub fn globs(&self) -> &'static [&'static str] {
        self.globs
    }
}

/// The built-in triage table. Ordered most-specific-first; the first
/// matching category wins.
pub fn triage_categories() -> Vec<TriageCategory> {
    vec![
        TriageCategory::new(
            "package-manager-provided binaries",
            Confidence::High,
            &["brew", "apt", "pacman", "*.deb", "*.rpm"],
        ),
        TriageCategory::new(
            "language toolchain shims",
            Confidence::High,
            &["rustup", "cargo", "rbenv", "pyenv", "nvm", "asdf", "*-shim"],
        ),
        TriageCategory::new(
            "IDE extensions",
            Confidence::Medium,
            &["*.vsix", "extensions", "*-extension"],
        ),
        TriageCategory::new("unknown", Confidence::Low, &["*"]),
    ]
}

/// Sensitive file basenames the Ignore Engine's defaults already cover
/// (spec §4.2); exposed separately so Doctor and Adopt can warn even
/// when a user has overridden the default ignore set.
pub fn sensitive_file_patterns() -> &'static [&'static str] {
    &[
        "id_rsa", "id_dsa", "id_ecdsa", "id_ed25519", "*.pem", ".netrc", ".pgpass",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_path_under_protected_config_dir() {
        let guard = ProtectedPaths::new("/home/user/.config/dotkeep", "/home/user/.local/share/dotkeep");
        let err = guard
            .guard("evil", Path::new("/home/user/.config/dotkeep/state.json"))
            .unwrap_err();
        assert!(matches!(err, Error::SelfManagement { .. }));
    }

    #[test]
    fn guard_rejects_replacing_ancestor_of_protected_dir() {
        let guard = ProtectedPaths::new("/home/user/.config/dotkeep", "/home/user/.local/share/dotkeep");
        let err = guard.guard("evil", Path::new("/home/user/.config")).unwrap_err();
        assert!(matches!(err, Error::SelfManagement { .. }));
    }

    #[test]
    fn guard_allows_unrelated_path() {
        let guard = ProtectedPaths::new("/home/user/.config/dotkeep", "/home/user/.local/share/dotkeep");
        assert!(guard.guard("vim", Path::new("/home/user/.vimrc")).is_ok());
    }

    #[test]
    fn triage_matches_toolchain_shims() {
        let categories = triage_categories();
        let toolchain = categories
            .iter()
            .find(|c| c.name == "language toolchain shims")
            .unwrap();
        assert!(toolchain.matches("cargo"));
    }
}
