// src/services/adopt.rs

//! Adopt: move a real file or directory already at its target location
//! into a package, then hand off to Manage to link it back (spec §4.12).

use crate::config::Config;
use crate::dotfile;
use crate::error::{Error, Result};
use crate::executor::{ExecutionMode, Executor};
use crate::filesystem::FilesystemPort;
use crate::ignore::IgnoreSet;
use crate::manifest::PackageSource;
use crate::operations::{Operation, OperationPayload};
use crate::package::is_reserved_package_name;
use crate::path::PackagePath;
use crate::planner::sort::sort;
use crate::safety::ProtectedPaths;
use crate::scanner::Scanner;
use crate::services::manage::{ManageReport, ManageService};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub struct AdoptService<'a> {
    fs: &'a dyn FilesystemPort,
    config: &'a Config,
    guard: &'a ProtectedPaths,
}

impl<'a> AdoptService<'a> {
    pub fn new(fs: &'a dyn FilesystemPort, config: &'a Config, guard: &'a ProtectedPaths) -> Self {
        Self { fs, config, guard }
    }

    /// Adopt `real_path` (an existing file or directory under the target
    /// directory) into `package_name`, then run Manage so the usual
    /// resolve/fold/link pipeline puts a symlink back in its place.
    pub fn adopt(&self, package_name: &str, real_path: &Path) -> Result<ManageReport> {
        if is_reserved_package_name(package_name) {
            return Err(Error::ReservedPackageName {
                name: package_name.to_string(),
            });
        }
        self.guard.guard(package_name, real_path)?;

        if !self.fs.exists(real_path) {
            return Err(Error::SourceNotFound {
                path: real_path.to_path_buf(),
            });
        }
        if self.fs.is_symlink(real_path) {
            return Err(Error::Conflict {
                kind: "AlreadyManaged".to_string(),
                path: real_path.to_path_buf(),
                details: "target is already a symlink".to_string(),
                suggestions: vec!["use remanage instead".to_string()],
            });
        }

        let package_root = self.config.package_dir.join(package_name);

        if self.fs.is_dir(real_path) {
            self.adopt_directory(package_name, real_path, package_root.as_path())?;
        } else {
            self.adopt_file(real_path, package_root.as_path())?;
        }

        let mut sources = HashMap::new();
        sources.insert(package_name.to_string(), PackageSource::Adopted);
        ManageService::new(self.fs, self.config, self.guard)
            .manage_with_sources(&[package_name.to_string()], &sources)
    }

    /// Move a single file at `real_path` to `package_root`, translating its
    /// name component-wise, creating whatever package-relative ancestor
    /// directories don't exist yet.
    fn adopt_file(&self, real_path: &Path, package_root: &Path) -> Result<()> {
        let rel = real_path
            .strip_prefix(self.config.target_dir.as_path())
            .map_err(|_| {
                Error::InvalidPath(format!(
                    "{} is not under the target directory",
                    real_path.display()
                ))
            })?;
        let stored_rel = dotfile::to_stored(rel);
        let dest = package_root.join(&stored_rel);

        if self.fs.exists(&dest) {
            return Err(Error::AlreadyExists(dest.display().to_string()));
        }

        let missing_dirs = self.missing_ancestor_dirs(&dest, package_root, &mut BTreeSet::new());
        let mut ops: Vec<Operation> = dir_create_ops(missing_dirs);
        ops.push(Operation::new(
            "adopt-move",
            OperationPayload::FileMove {
                source: real_path.to_path_buf(),
                dest,
            },
        ));

        let sorted = sort(ops)?;
        Executor::new(self.fs, ExecutionMode::Sequential).commit(sorted)?;
        Ok(())
    }

    /// Move a directory's *contents* flat into `package_root`, translating
    /// each path component, then drop the now-empty original directory.
    /// The directory itself is never nested one level deeper under
    /// `package_root` — only its children land there.
    fn adopt_directory(&self, package_name: &str, real_path: &Path, package_root: &Path) -> Result<()> {
        let scanned = Scanner::new(self.fs).scan(
            package_name,
            PackagePath::new(real_path)?,
            &IgnoreSet::new(),
        )?;
        let files = scanned.files();
        if files.is_empty() {
            return Err(Error::InvalidPath(format!(
                "{} is an empty directory; nothing to adopt",
                real_path.display()
            )));
        }

        let mut seen_dirs = BTreeSet::new();
        let mut missing_dirs = BTreeSet::new();
        let mut ops = Vec::with_capacity(files.len());
        for (rel, _perm) in files {
            let dest = package_root.join(dotfile::to_stored(rel));
            if self.fs.exists(&dest) {
                return Err(Error::AlreadyExists(dest.display().to_string()));
            }
            missing_dirs.extend(self.missing_ancestor_dirs(&dest, package_root, &mut seen_dirs));
            ops.push(Operation::new(
                format!("adopt-move-{}", rel.display()),
                OperationPayload::FileMove {
                    source: real_path.join(rel),
                    dest,
                },
            ));
        }

        let mut dir_ops = dir_create_ops(missing_dirs.into_iter().collect());
        dir_ops.extend(ops);

        let sorted = sort(dir_ops)?;
        Executor::new(self.fs, ExecutionMode::Sequential).commit(sorted)?;

        self.fs.remove_all(real_path)?;
        Ok(())
    }

    /// Walk upward from `dest`'s parent, collecting directories under
    /// `package_root` that don't exist on disk yet, stopping at the first
    /// ancestor already present in `seen` (already queued by a prior call).
    fn missing_ancestor_dirs(
        &self,
        dest: &Path,
        package_root: &Path,
        seen: &mut BTreeSet<PathBuf>,
    ) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        let mut ancestor = dest.parent().map(|p| p.to_path_buf());
        while let Some(dir) = ancestor {
            if !dir.starts_with(package_root) || self.fs.exists(&dir) || !seen.insert(dir.clone()) {
                break;
            }
            missing.push(dir.clone());
            ancestor = dir.parent().map(|p| p.to_path_buf());
        }
        missing.reverse();
        missing
    }
}

fn dir_create_ops(dirs: Vec<PathBuf>) -> Vec<Operation> {
    dirs.into_iter()
        .enumerate()
        .map(|(i, dir)| Operation::new(format!("adopt-dir-{i}"), OperationPayload::DirCreate { path: dir }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::filesystem::InMemoryFilesystem;
    use crate::manifest::{Manifest, PackageSource};

    fn setup() -> (InMemoryFilesystem, Config, ProtectedPaths) {
        let fs = InMemoryFilesystem::new();
        fs.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        fs.mkdir_all(Path::new("/home/user"), 0o755).unwrap();
        fs.write_file(Path::new("/home/user/.bashrc"), b"", 0o644).unwrap();
        fs.write_file(Path::new("/home/user/.vimrc"), b"set nu\n", 0o644)
            .unwrap();

        let config = ConfigBuilder::new("/pkg", "/home/user")
            .package_name_mapping(false)
            .build()
            .unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        (fs, config, guard)
    }

    #[test]
    fn adopt_moves_file_into_package_and_links_it_back() {
        let (fs, config, guard) = setup();
        let service = AdoptService::new(&fs, &config, &guard);
        let report = service.adopt("vim", Path::new("/home/user/.vimrc")).unwrap();

        assert!(report.is_clean());
        assert!(fs.is_symlink(Path::new("/home/user/.vimrc")));
        assert_eq!(
            fs.read_file(Path::new("/pkg/vim/dot-vimrc")).unwrap(),
            b"set nu\n"
        );

        let manifest = Manifest::load(&config.manifest_dir).unwrap();
        let info = manifest.get_package("vim").unwrap();
        assert_eq!(info.source, PackageSource::Adopted);
    }

    #[test]
    fn adopt_rejects_reserved_package_name() {
        let (fs, config, guard) = setup();
        let service = AdoptService::new(&fs, &config, &guard);
        let err = service
            .adopt("dot-config", Path::new("/home/user/.vimrc"))
            .unwrap_err();
        assert!(matches!(err, Error::ReservedPackageName { .. }));
    }

    #[test]
    fn adopt_moves_directory_contents_flat_into_package() {
        // Directory adopts fold back into one symlink named after the
        // package, which requires package-name-to-target-path mapping —
        // the opposite of `setup()`'s flat single-file fixture.
        let fs = InMemoryFilesystem::new();
        fs.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        fs.mkdir_all(Path::new("/home/user/.ssh"), 0o700).unwrap();
        fs.write_file(Path::new("/home/user/.ssh/config"), b"Host *", 0o600)
            .unwrap();
        fs.write_file(Path::new("/home/user/.ssh/known_hosts"), b"kh", 0o644)
            .unwrap();
        fs.write_file(Path::new("/home/user/.ssh/.hidden"), b"h", 0o644)
            .unwrap();

        let config = ConfigBuilder::new("/pkg", "/home/user").build().unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let service = AdoptService::new(&fs, &config, &guard);
        let report = service
            .adopt("dot-ssh", Path::new("/home/user/.ssh"))
            .unwrap();
        assert!(report.is_clean(), "{:?}", report);

        // Contents land directly under the package root, not nested under
        // a second `dot-ssh/` level.
        assert_eq!(fs.read_file(Path::new("/pkg/dot-ssh/config")).unwrap(), b"Host *");
        assert_eq!(
            fs.read_file(Path::new("/pkg/dot-ssh/known_hosts")).unwrap(),
            b"kh"
        );
        assert_eq!(
            fs.read_file(Path::new("/pkg/dot-ssh/dot-hidden")).unwrap(),
            b"h"
        );
        assert!(!fs.exists(Path::new("/pkg/dot-ssh/dot-ssh")));

        assert!(fs.is_symlink(Path::new("/home/user/.ssh")));
        assert_eq!(
            fs.read_link(Path::new("/home/user/.ssh")).unwrap(),
            PathBuf::from("../../pkg/dot-ssh")
        );

        let manifest = Manifest::load(&config.manifest_dir).unwrap();
        let info = manifest.get_package("dot-ssh").unwrap();
        assert_eq!(info.source, PackageSource::Adopted);
    }

    #[test]
    fn adopt_rejects_already_symlinked_target() {
        let (fs, config, guard) = setup();
        fs.remove(Path::new("/home/user/.vimrc")).unwrap();
        fs.symlink(Path::new("/pkg/vim/dot-vimrc"), Path::new("/home/user/.vimrc"))
            .unwrap();
        let service = AdoptService::new(&fs, &config, &guard);
        let err = service
            .adopt("vim", Path::new("/home/user/.vimrc"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }
}
