// src/services/unmanage.rs

//! Unmanage: reverse a package's recorded links, restoring any backup
//! that Manage made for them, and — for packages whose source is
//! *adopted* — restoring the original file or directory into the
//! target from the package, never removing Manage's own authored
//! content (spec §4.12).

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{ExecutionMode, ExecutionResult, Executor};
use crate::filesystem::FilesystemPort;
use crate::manifest::{Manifest, PackageSource};
use crate::operations::{Operation, OperationPayload};
use crate::path::resolve_relative;
use crate::planner::sort::sort;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Options beyond the default "remove every recorded link" behavior
/// (spec §4.12).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmanageOptions {
    /// After links are gone, also delete the package directory itself.
    pub purge: bool,
    /// Only process named packages whose every recorded link is
    /// already absent from the target (already orphaned); skip the
    /// rest untouched.
    pub cleanup: bool,
}

pub struct UnmanageService<'a> {
    fs: &'a dyn FilesystemPort,
    config: &'a Config,
}

impl<'a> UnmanageService<'a> {
    pub fn new(fs: &'a dyn FilesystemPort, config: &'a Config) -> Self {
        Self { fs, config }
    }

    pub fn unmanage(&self, package_names: &[String]) -> Result<ExecutionResult> {
        self.unmanage_with_options(package_names, &UnmanageOptions::default())
    }

    pub fn unmanage_with_options(
        &self,
        package_names: &[String],
        options: &UnmanageOptions,
    ) -> Result<ExecutionResult> {
        let now = Utc::now();
        let mut manifest = Manifest::load(&self.config.manifest_dir)?;

        let mut selected = Vec::with_capacity(package_names.len());
        for name in package_names {
            let info = manifest
                .get_package(name)
                .ok_or_else(|| Error::PackageNotFound { name: name.clone() })?;
            if options.cleanup {
                let orphaned = info
                    .links
                    .iter()
                    .all(|rel| !self.fs.exists(&self.config.target_dir.as_path().join(rel)));
                if !orphaned {
                    continue;
                }
            }
            selected.push(name.clone());
        }

        if selected.is_empty() {
            return Ok(ExecutionResult::default());
        }

        let mut ops = Vec::new();
        // Adopted content restores as a real file or directory copied
        // back from the package (never a move — the package side stays
        // intact; spec §4.12 Adopt/Unmanage round-trip). `sort()`'s
        // dependency rules don't know about `DirCopy`/restore-`FileBackup`
        // at all, so a `LinkDelete` and the copy that repopulates the
        // same path can't be trusted to land in the same sorted plan in
        // the right order. Run each pair directly, in sequence, once the
        // sorted plan below (ordinary link removal and backup restores)
        // has succeeded.
        let mut directory_restores = Vec::new();
        let mut file_restores = Vec::new();
        let mut id = 0u64;
        for name in &selected {
            let info = manifest.get_package(name).expect("selected from manifest above");
            let adopted = info.source == PackageSource::Adopted;

            for rel in &info.links {
                let target = self.config.target_dir.as_path().join(rel);
                if self.fs.is_symlink(&target) {
                    if adopted {
                        let source = resolve_link_source(self.fs, &target)?;
                        if info.directory_links.contains(rel) {
                            directory_restores.push((target.clone(), source));
                        } else {
                            file_restores.push((target.clone(), source));
                        }
                    } else {
                        id += 1;
                        ops.push(Operation::new(
                            format!("unmanage-{id}"),
                            OperationPayload::LinkDelete { target: target.clone() },
                        ));
                    }
                }
                if let Some(backup) = info.backups.get(rel) {
                    id += 1;
                    ops.push(Operation::new(
                        format!("unmanage-{id}"),
                        OperationPayload::FileMove {
                            source: PathBuf::from(backup),
                            dest: target,
                        },
                    ));
                }
            }
        }

        let mut result = if ops.is_empty() {
            ExecutionResult::default()
        } else {
            let sorted = sort(ops)?;
            Executor::new(self.fs, ExecutionMode::Sequential).commit(sorted)?
        };

        if result.success() {
            for (target, source) in &directory_restores {
                let delete = Operation::new(
                    "unmanage-dir-delete",
                    OperationPayload::LinkDelete { target: target.clone() },
                );
                delete.execute(self.fs)?;
                let copy = Operation::new(
                    "unmanage-dir-copy",
                    OperationPayload::DirCopy {
                        source: source.clone(),
                        dest: target.clone(),
                    },
                );
                copy.execute(self.fs)?;
                result.executed.push(format!(
                    "restore directory {} from {}",
                    target.display(),
                    source.display()
                ));
            }
            for (target, source) in &file_restores {
                let delete = Operation::new(
                    "unmanage-file-delete",
                    OperationPayload::LinkDelete { target: target.clone() },
                );
                delete.execute(self.fs)?;
                // `FileBackup` copies `source` -> `backup_dest` preserving
                // permissions without removing `source` — exactly the
                // "copy, not move" restore spec §4.12 calls for, just with
                // the package file playing the role `FileBackup` usually
                // gives a conflicting target file.
                let restore = Operation::new(
                    "unmanage-file-restore",
                    OperationPayload::FileBackup {
                        source: source.clone(),
                        backup_dest: target.clone(),
                    },
                );
                restore.execute(self.fs)?;
                result.executed.push(format!(
                    "restore file {} from {}",
                    target.display(),
                    source.display()
                ));
            }
        }

        if result.success() && options.purge {
            for name in &selected {
                let info = manifest.get_package(name).expect("selected from manifest above");
                let package_dir = PathBuf::from(&info.package_dir);
                if self.fs.exists(&package_dir) {
                    Operation::new(
                        "unmanage-purge",
                        OperationPayload::DirRemoveAll { path: package_dir.clone() },
                    )
                    .execute(self.fs)?;
                    result
                        .executed
                        .push(format!("purge package directory {}", package_dir.display()));
                }
            }
        }

        if result.success() {
            for name in &selected {
                manifest.remove_package(name);
            }
            manifest.touch(now);
            manifest.save(&self.config.manifest_dir)?;
        }

        Ok(result)
    }
}

fn resolve_link_source(fs: &dyn FilesystemPort, target: &Path) -> Result<PathBuf> {
    let raw = fs.read_link(target)?;
    let base = target.parent().unwrap_or(Path::new("/"));
    Ok(resolve_relative(base, &raw))
}
