// src/config.rs

//! Runtime configuration (spec §6). All configuration is passed at
//! construction; there is no global state in the core.

use crate::error::{Error, Result};
use crate::path::{PackagePath, TargetPath};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Fail,
    Skip,
    Backup,
    Overwrite,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub package_dir: PackagePath,
    pub target_dir: TargetPath,
    pub link_mode: LinkMode,
    pub folding: bool,
    pub dry_run: bool,
    pub verbosity: u8,
    pub backup_dir: PathBuf,
    pub backup: bool,
    pub overwrite: bool,
    pub manifest_dir: PathBuf,
    pub concurrency: usize,
    pub package_name_mapping: bool,
    /// The policy applied when `LinkCreate` meets a regular file, a
    /// symlink pointing elsewhere, or a directory. `overwrite` always
    /// takes precedence over `backup` when both are set (spec §6).
    pub on_file_exists: ConflictPolicy,
}

pub struct ConfigBuilder {
    package_dir: PathBuf,
    target_dir: PathBuf,
    link_mode: LinkMode,
    folding: bool,
    dry_run: bool,
    verbosity: u8,
    backup_dir: Option<PathBuf>,
    backup: bool,
    overwrite: bool,
    manifest_dir: Option<PathBuf>,
    concurrency: usize,
    package_name_mapping: bool,
}

impl ConfigBuilder {
    pub fn new(package_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_dir: package_dir.into(),
            target_dir: target_dir.into(),
            link_mode: LinkMode::Relative,
            folding: true,
            dry_run: false,
            verbosity: 0,
            backup_dir: None,
            backup: false,
            overwrite: false,
            manifest_dir: None,
            concurrency: 0,
            package_name_mapping: true,
        }
    }

    pub fn link_mode(mut self, mode: LinkMode) -> Self {
        self.link_mode = mode;
        self
    }

    pub fn folding(mut self, enabled: bool) -> Self {
        self.folding = enabled;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.verbosity = level;
        self
    }

    pub fn backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(path.into());
        self
    }

    pub fn backup(mut self, enabled: bool) -> Self {
        self.backup = enabled;
        self
    }

    pub fn overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    pub fn manifest_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_dir = Some(path.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn package_name_mapping(mut self, enabled: bool) -> Self {
        self.package_name_mapping = enabled;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.package_dir.as_os_str().is_empty() || !self.package_dir.is_absolute() {
            return Err(Error::InvalidPath("packageDir must be absolute and non-empty".into()));
        }
        if self.target_dir.as_os_str().is_empty() || !self.target_dir.is_absolute() {
            return Err(Error::InvalidPath("targetDir must be absolute and non-empty".into()));
        }

        let backup_dir = self
            .backup_dir
            .unwrap_or_else(|| self.target_dir.join(".dot-backup"));
        let manifest_dir = self.manifest_dir.unwrap_or_else(|| self.target_dir.clone());

        // overwrite takes precedence over backup.
        let on_file_exists = if self.overwrite {
            ConflictPolicy::Overwrite
        } else if self.backup {
            ConflictPolicy::Backup
        } else {
            ConflictPolicy::Fail
        };

        let concurrency = if self.concurrency == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.concurrency
        };

        Ok(Config {
            package_dir: PackagePath::new(&self.package_dir)?,
            target_dir: TargetPath::new(&self.target_dir)?,
            link_mode: self.link_mode,
            folding: self.folding,
            dry_run: self.dry_run,
            verbosity: self.verbosity,
            backup_dir,
            backup: self.backup,
            overwrite: self.overwrite,
            manifest_dir,
            concurrency,
            package_name_mapping: self.package_name_mapping,
            on_file_exists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_takes_precedence_over_backup() {
        let config = ConfigBuilder::new("/pkg", "/home/user")
            .backup(true)
            .overwrite(true)
            .build()
            .unwrap();
        assert_eq!(config.on_file_exists, ConflictPolicy::Overwrite);
    }

    #[test]
    fn rejects_relative_package_dir() {
        assert!(ConfigBuilder::new("pkg", "/home/user").build().is_err());
    }

    #[test]
    fn defaults_backup_dir_and_manifest_dir() {
        let config = ConfigBuilder::new("/pkg", "/home/user").build().unwrap();
        assert_eq!(config.backup_dir, PathBuf::from("/home/user/.dot-backup"));
        assert_eq!(config.manifest_dir, PathBuf::from("/home/user"));
    }

    #[test]
    fn zero_concurrency_resolves_to_cpu_count() {
        let config = ConfigBuilder::new("/pkg", "/home/user").build().unwrap();
        assert!(config.concurrency >= 1);
    }
}
