// src/services/remanage.rs

//! Remanage: re-derive a package's links after its source tree changed,
//! skipping the work entirely when the content hash is unchanged and
//! every declared link is still in place, and falling through to a
//! full Manage for a package the manifest doesn't know about yet
//! (spec §4.12).

use super::build_ignore_set;
use crate::config::Config;
use crate::content_hash::hash_package;
use crate::error::Result;
use crate::filesystem::FilesystemPort;
use crate::hash::Hash;
use crate::manifest::Manifest;
use crate::safety::ProtectedPaths;
use crate::services::manage::{ManageReport, ManageService};
use crate::services::unmanage::UnmanageService;
use std::collections::HashMap;

#[derive(Debug)]
pub struct RemanageReport {
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    pub result: Option<ManageReport>,
}

pub struct RemanageService<'a> {
    fs: &'a dyn FilesystemPort,
    config: &'a Config,
    guard: &'a ProtectedPaths,
}

impl<'a> RemanageService<'a> {
    pub fn new(fs: &'a dyn FilesystemPort, config: &'a Config, guard: &'a ProtectedPaths) -> Self {
        Self { fs, config, guard }
    }

    pub fn remanage(&self, package_names: &[String]) -> Result<RemanageReport> {
        let manifest = Manifest::load(&self.config.manifest_dir)?;
        let ignore = build_ignore_set(&manifest);

        let mut changed = Vec::new();
        let mut unchanged = Vec::new();
        let mut prior_sources = HashMap::new();
        // Only packages the manifest already has an entry for go through
        // Unmanage first; a package absent from the manifest has nothing
        // recorded to tear down and goes straight to a full Manage.
        let mut previously_installed = Vec::new();

        for name in package_names {
            let Some(info) = manifest.get_package(name) else {
                prior_sources.insert(name.clone(), crate::manifest::PackageSource::Managed);
                changed.push(name.clone());
                continue;
            };

            let pkg_path = self.config.package_dir.join(name);
            let fresh_hash = hash_package(self.fs, pkg_path.as_path(), &ignore)?;
            let stored_hash =
                Hash::parse_prefixed(&info.hash).map_err(|e| crate::error::Error::ManifestCorrupt(e.to_string()))?;

            let links_intact = info
                .links
                .iter()
                .all(|rel| self.fs.exists(&self.config.target_dir.as_path().join(rel)));

            if fresh_hash == stored_hash && links_intact {
                unchanged.push(name.clone());
            } else {
                prior_sources.insert(name.clone(), info.source);
                previously_installed.push(name.clone());
                changed.push(name.clone());
            }
        }

        if changed.is_empty() {
            return Ok(RemanageReport {
                changed,
                unchanged,
                result: None,
            });
        }

        if !previously_installed.is_empty() {
            UnmanageService::new(self.fs, self.config).unmanage(&previously_installed)?;
        }
        let result = ManageService::new(self.fs, self.config, self.guard)
            .manage_with_sources(&changed, &prior_sources)?;

        Ok(RemanageReport {
            changed,
            unchanged,
            result: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::filesystem::InMemoryFilesystem;
    use std::path::Path;

    fn setup() -> (InMemoryFilesystem, Config, ProtectedPaths) {
        let fs = InMemoryFilesystem::new();
        fs.mkdir_all(Path::new("/pkg/vim"), 0o755).unwrap();
        fs.write_file(Path::new("/pkg/vim/dot-vimrc"), b"set nu\n", 0o644)
            .unwrap();
        fs.mkdir_all(Path::new("/home/user"), 0o755).unwrap();
        fs.write_file(Path::new("/home/user/.bashrc"), b"", 0o644).unwrap();

        let config = ConfigBuilder::new("/pkg", "/home/user")
            .package_name_mapping(false)
            .build()
            .unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        (fs, config, guard)
    }

    #[test]
    fn remanage_is_a_no_op_when_content_is_unchanged() {
        let (fs, config, guard) = setup();
        ManageService::new(&fs, &config, &guard)
            .manage(&["vim".to_string()])
            .unwrap();

        let report = RemanageService::new(&fs, &config, &guard)
            .remanage(&["vim".to_string()])
            .unwrap();

        assert_eq!(report.unchanged, vec!["vim".to_string()]);
        assert!(report.changed.is_empty());
        assert!(report.result.is_none());
    }

    #[test]
    fn remanage_re_derives_links_after_content_changes() {
        let (fs, config, guard) = setup();
        ManageService::new(&fs, &config, &guard)
            .manage(&["vim".to_string()])
            .unwrap();

        fs.write_file(Path::new("/pkg/vim/dot-gvimrc"), b"set gui\n", 0o644)
            .unwrap();

        let report = RemanageService::new(&fs, &config, &guard)
            .remanage(&["vim".to_string()])
            .unwrap();

        assert_eq!(report.changed, vec!["vim".to_string()]);
        assert!(fs.is_symlink(Path::new("/home/user/.gvimrc")));
    }

    #[test]
    fn remanage_falls_through_to_full_manage_when_not_in_manifest() {
        let (fs, config, guard) = setup();
        // No prior `manage` call — "vim" is on disk but has no manifest entry.
        let report = RemanageService::new(&fs, &config, &guard)
            .remanage(&["vim".to_string()])
            .unwrap();

        assert_eq!(report.changed, vec!["vim".to_string()]);
        assert!(report.unchanged.is_empty());
        let result = report.result.expect("remanage executed a plan");
        assert!(result.is_clean(), "{:?}", result);
        assert!(fs.is_symlink(Path::new("/home/user/.vimrc")));
    }

    #[test]
    fn remanage_reinstalls_when_content_unchanged_but_a_link_is_missing() {
        let (fs, config, guard) = setup();
        ManageService::new(&fs, &config, &guard)
            .manage(&["vim".to_string()])
            .unwrap();
        fs.remove(Path::new("/home/user/.vimrc")).unwrap();

        let report = RemanageService::new(&fs, &config, &guard)
            .remanage(&["vim".to_string()])
            .unwrap();

        assert_eq!(report.changed, vec!["vim".to_string()]);
        assert!(report.unchanged.is_empty());
        assert!(fs.is_symlink(Path::new("/home/user/.vimrc")));
    }
}
