// src/services/manage.rs

//! Manage: scan packages, resolve them against the target directory,
//! execute the resulting plan, and persist the manifest (spec §4.12).

use super::build_ignore_set;
use crate::config::Config;
use crate::content_hash::hash_package;
use crate::error::Result;
use crate::executor::{ExecutionMode, ExecutionResult, Executor};
use crate::filesystem::FilesystemPort;
use crate::manifest::{Manifest, PackageInfo, PackageSource};
use crate::operations::OperationPayload;
use crate::package::Package;
use crate::planner::{Collision, Conflict, DesiredState, DesiredStateBuilder, Resolver};
use crate::planner::sort::sort;
use crate::safety::ProtectedPaths;
use crate::scanner::Scanner;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Outcome of a Manage run. `conflicts` non-empty means nothing was
/// executed — the caller must resolve them (or rerun with a different
/// conflict policy) before anything lands on disk.
#[derive(Debug)]
pub struct ManageReport {
    pub packages: Vec<String>,
    pub result: ExecutionResult,
    pub conflicts: Vec<Conflict>,
    pub collisions: Vec<Collision>,
    pub warnings: Vec<String>,
}

impl ManageReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.collisions.is_empty() && self.result.success()
    }
}

pub struct ManageService<'a> {
    fs: &'a dyn FilesystemPort,
    config: &'a Config,
    guard: &'a ProtectedPaths,
}

impl<'a> ManageService<'a> {
    pub fn new(fs: &'a dyn FilesystemPort, config: &'a Config, guard: &'a ProtectedPaths) -> Self {
        Self { fs, config, guard }
    }

    pub fn manage(&self, package_names: &[String]) -> Result<ManageReport> {
        self.manage_with_sources(package_names, &HashMap::new())
    }

    /// Same pipeline as `manage`, but `sources` overrides the recorded
    /// `PackageSource` for the named packages (defaulting to `Managed`
    /// for anything not present) — used by Adopt and Remanage, which
    /// route through this pipeline but need a different or preserved
    /// provenance tag.
    pub fn manage_with_sources(
        &self,
        package_names: &[String],
        sources: &HashMap<String, PackageSource>,
    ) -> Result<ManageReport> {
        let now = Utc::now();
        let mut manifest = Manifest::load_or_default(&self.config.manifest_dir, now)?;
        let ignore = build_ignore_set(&manifest);

        let scanner = Scanner::new(self.fs);
        let mut packages = Vec::with_capacity(package_names.len());
        for name in package_names {
            let pkg_path = self.config.package_dir.join(name);
            packages.push(scanner.scan(name, pkg_path, &ignore)?);
        }

        let builder = DesiredStateBuilder::new(
            self.fs,
            self.config.target_dir.as_path(),
            self.config.package_name_mapping,
            self.config.folding,
        );
        let (desired, collisions) = builder.build(&packages);

        let resolver = Resolver::new(
            self.fs,
            self.config.target_dir.as_path(),
            &self.config.backup_dir,
            self.config.on_file_exists,
            self.guard,
            self.config.link_mode,
        );
        let resolve_result = resolver.resolve(&desired)?;

        if !resolve_result.conflicts.is_empty() {
            return Ok(ManageReport {
                packages: package_names.to_vec(),
                result: ExecutionResult::default(),
                conflicts: resolve_result.conflicts,
                collisions,
                warnings: resolve_result.warnings,
            });
        }

        let backups = backup_destinations(&resolve_result.operations);

        let exec_result = if resolve_result.operations.is_empty() {
            ExecutionResult::default()
        } else if self.config.dry_run {
            ExecutionResult::default()
        } else {
            let sorted = sort(resolve_result.operations)?;
            let executor = Executor::new(self.fs, ExecutionMode::Parallel);
            executor.commit(sorted)?
        };

        if exec_result.success() && !self.config.dry_run {
            self.record_packages(&mut manifest, &packages, &desired, &backups, sources, now)?;
            manifest.touch(now);
            manifest.save(&self.config.manifest_dir)?;
        }

        Ok(ManageReport {
            packages: package_names.to_vec(),
            result: exec_result,
            conflicts: Vec::new(),
            collisions,
            warnings: resolve_result.warnings,
        })
    }

    fn record_packages(
        &self,
        manifest: &mut Manifest,
        packages: &[Package],
        desired: &DesiredState,
        backups: &HashMap<PathBuf, PathBuf>,
        sources: &HashMap<String, PackageSource>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ignore = build_ignore_set(manifest);
        for package in packages {
            let source = sources
                .get(&package.name)
                .copied()
                .unwrap_or(PackageSource::Managed);
            let mut links = Vec::new();
            let mut directory_links = HashSet::new();
            let mut package_backups = HashMap::new();
            for (target, link) in &desired.links {
                if link.package != package.name {
                    continue;
                }
                let rel = rel_to_target(self.config.target_dir.as_path(), target);
                if link.directory {
                    directory_links.insert(rel.clone());
                }
                if let Some(backup_dest) = backups.get(target) {
                    package_backups.insert(rel.clone(), backup_dest.display().to_string());
                }
                links.push(rel);
            }
            links.sort();

            let hash = hash_package(self.fs, package.path.as_path(), &ignore)?;
            manifest.upsert_package(PackageInfo {
                name: package.name.clone(),
                source,
                installed_at: now,
                link_count: links.len(),
                links,
                directory_links,
                backups: package_backups,
                hash: hash.to_prefixed_string(),
                target_dir: self.config.target_dir.to_string_lossy(),
                package_dir: package.path.to_string_lossy(),
            });
        }
        Ok(())
    }
}

fn backup_destinations(operations: &[crate::operations::Operation]) -> HashMap<PathBuf, PathBuf> {
    operations
        .iter()
        .filter_map(|op| match op.payload() {
            OperationPayload::FileBackup { source, backup_dest } => {
                Some((source.clone(), backup_dest.clone()))
            }
            _ => None,
        })
        .collect()
}

fn rel_to_target(target_dir: &Path, target: &Path) -> String {
    target
        .strip_prefix(target_dir)
        .unwrap_or(target)
        .to_string_lossy()
        .to_string()
}
