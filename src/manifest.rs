// src/manifest.rs

//! Persisted per-target record of installed packages (spec §3, §4.7).
//!
//! Writers serialize to a temp file inside the manifest directory, fsync,
//! then rename over the canonical `.dot-manifest.json`. Readers treat a
//! missing file as "no packages managed" rather than an error.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = ".dot-manifest.json";
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    Managed,
    Adopted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub source: PackageSource,
    pub installed_at: DateTime<Utc>,
    pub link_count: usize,
    /// Relative to `target_dir`.
    pub links: Vec<String>,
    /// Subset of `links` that are whole-directory folds rather than
    /// single-file links — Unmanage needs to know which without
    /// re-deriving fold decisions from the filesystem.
    #[serde(default)]
    pub directory_links: HashSet<String>,
    /// Target-relative path -> absolute backup path.
    #[serde(default)]
    pub backups: HashMap<String, String>,
    pub hash: String,
    pub target_dir: String,
    pub package_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoredLink {
    pub source: String,
    pub reason: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IgnoredSet {
    #[serde(default)]
    pub links: HashMap<String, IgnoredLink>,
    #[serde(default)]
    pub patterns: HashSet<String>,
}

/// Counts from the most recent Doctor run. Doctor scope/skip-pattern
/// *configuration* is always a runtime parameter, never persisted here
/// (spec §9 open question ii) — this struct is a summary only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub last_run_at: DateTime<Utc>,
    pub orphan_count: usize,
    pub broken_count: usize,
    pub issue_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub packages: HashMap<String, PackageInfo>,
    #[serde(default)]
    pub ignored: IgnoredSet,
    #[serde(default)]
    pub doctor: Option<DoctorSummary>,
}

impl Manifest {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_VERSION,
            updated_at: now,
            packages: HashMap::new(),
            ignored: IgnoredSet::default(),
            doctor: None,
        }
    }

    pub fn canonical_path(manifest_dir: &Path) -> PathBuf {
        manifest_dir.join(MANIFEST_FILE_NAME)
    }

    /// Load a manifest from `manifest_dir`. A missing file yields
    /// `Error::ManifestNotFound`, the "soft" signal callers translate at
    /// the service boundary.
    pub fn load(manifest_dir: &Path) -> Result<Self> {
        let path = Self::canonical_path(manifest_dir);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestNotFound)
            }
            Err(e) => return Err(Error::Io(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| Error::ManifestCorrupt(e.to_string()))
    }

    /// Load a manifest, or a fresh empty one if none exists yet — the
    /// translation the error-handling design mandates for read paths
    /// (Status, Doctor).
    pub fn load_or_default(manifest_dir: &Path, now: DateTime<Utc>) -> Result<Self> {
        match Self::load(manifest_dir) {
            Ok(manifest) => Ok(manifest),
            Err(Error::ManifestNotFound) => Ok(Self::new(now)),
            Err(e) => Err(e),
        }
    }

    /// Atomically persist to `manifest_dir`: write to a sibling temp
    /// file, fsync, then rename over the canonical name. Creates the
    /// manifest directory with mode 0755 if it doesn't exist.
    pub fn save(&self, manifest_dir: &Path) -> Result<()> {
        if !manifest_dir.exists() {
            std::fs::create_dir_all(manifest_dir).map_err(|e| Error::ManifestWriteFailed(e.to_string()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(manifest_dir, std::fs::Permissions::from_mode(0o755));
            }
        }

        let json = serde_json::to_vec_pretty(self).map_err(|e| Error::ManifestWriteFailed(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(manifest_dir)
            .map_err(|e| Error::ManifestWriteFailed(e.to_string()))?;
        tmp.write_all(&json)
            .map_err(|e| Error::ManifestWriteFailed(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::ManifestWriteFailed(e.to_string()))?;

        tmp.persist(Self::canonical_path(manifest_dir))
            .map_err(|e| Error::ManifestWriteFailed(e.to_string()))?;
        Ok(())
    }

    pub fn upsert_package(&mut self, info: PackageInfo) {
        self.packages.insert(info.name.clone(), info);
    }

    pub fn remove_package(&mut self, name: &str) -> Option<PackageInfo> {
        self.packages.remove(name)
    }

    pub fn get_package(&self, name: &str) -> Option<&PackageInfo> {
        self.packages.get(name)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
