// src/facade.rs

//! Client Facade: single entry point combining all services with one
//! `Config` (spec §4, "Client Facade" row).

use crate::config::Config;
use crate::doctor::{self, DiagnosticReport, DoctorContext, FixAction, TriageAction};
use crate::error::Result;
use crate::filesystem::FilesystemPort;
use crate::manifest::Manifest;
use crate::safety::ProtectedPaths;
use crate::services::{
    AdoptService, ManageReport, ManageService, RemanageReport, RemanageService, UnmanageOptions, UnmanageService,
};
use crate::executor::ExecutionResult;
use std::path::Path;

/// Outcome of running Fix: every action taken and any that failed.
#[derive(Debug, Default)]
pub struct FixOutcome {
    pub applied: Vec<FixAction>,
    pub failed: Vec<(FixAction, String)>,
}

/// Wraps a `FilesystemPort`, `Config` and `ProtectedPaths` so callers
/// don't have to thread all three through every verb by hand.
pub struct Dotkeep<'a> {
    fs: &'a dyn FilesystemPort,
    config: Config,
    guard: ProtectedPaths,
}

impl<'a> Dotkeep<'a> {
    pub fn new(fs: &'a dyn FilesystemPort, config: Config, guard: ProtectedPaths) -> Self {
        Self { fs, config, guard }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manage(&self, package_names: &[String]) -> Result<ManageReport> {
        ManageService::new(self.fs, &self.config, &self.guard).manage(package_names)
    }

    pub fn unmanage(&self, package_names: &[String]) -> Result<ExecutionResult> {
        UnmanageService::new(self.fs, &self.config).unmanage(package_names)
    }

    pub fn unmanage_with_options(
        &self,
        package_names: &[String],
        options: &UnmanageOptions,
    ) -> Result<ExecutionResult> {
        UnmanageService::new(self.fs, &self.config).unmanage_with_options(package_names, options)
    }

    pub fn remanage(&self, package_names: &[String]) -> Result<RemanageReport> {
        RemanageService::new(self.fs, &self.config, &self.guard).remanage(package_names)
    }

    pub fn adopt(&self, package_name: &str, real_path: &Path) -> Result<ManageReport> {
        AdoptService::new(self.fs, &self.config, &self.guard).adopt(package_name, real_path)
    }

    pub fn doctor(&self, include_orphans: bool) -> Result<DiagnosticReport> {
        let manifest = Manifest::load_or_default(&self.config.manifest_dir, chrono::Utc::now())?;
        let ctx = DoctorContext {
            fs: self.fs,
            manifest: &manifest,
            target_dir: self.config.target_dir.as_path(),
            backup_dir: &self.config.backup_dir,
        };
        let mut checks = doctor::standard_checks();
        if !include_orphans {
            checks.retain(|c| c.name() != "orphaned-links");
        }
        Ok(doctor::diagnose(&ctx, &checks))
    }

    /// Apply every `FixAction` a `DiagnosticReport` implies (spec §4.11):
    /// recreate a managed link by rerunning Manage for its package, or
    /// delete a dangling managed or unmanaged link outright.
    pub fn fix(&self, report: &DiagnosticReport) -> Result<FixOutcome> {
        let manifest = Manifest::load_or_default(&self.config.manifest_dir, chrono::Utc::now())?;
        let ctx = DoctorContext {
            fs: self.fs,
            manifest: &manifest,
            target_dir: self.config.target_dir.as_path(),
            backup_dir: &self.config.backup_dir,
        };
        let actions = doctor::plan_fixes(&ctx, report);

        let mut outcome = FixOutcome::default();
        for action in actions {
            let result = match &action {
                FixAction::RecreateManaged { package } => {
                    self.manage(&[package.clone()]).map(|_| ())
                }
                FixAction::DeleteManagedLink { package, rel, target } => self.fs.remove(target).and_then(|()| {
                    let mut manifest = Manifest::load(&self.config.manifest_dir)?;
                    if let Some(info) = manifest.packages.get_mut(package) {
                        info.links.retain(|l| l != rel);
                        info.directory_links.remove(rel);
                        info.backups.remove(rel);
                        info.link_count = info.links.len();
                    }
                    manifest.touch(chrono::Utc::now());
                    manifest.save(&self.config.manifest_dir)
                }),
                FixAction::DeleteUnmanagedLink { target } => self.fs.remove(target),
            };
            match result {
                Ok(()) => outcome.applied.push(action),
                Err(e) => outcome.failed.push((action, e.to_string())),
            }
        }
        Ok(outcome)
    }

    /// Apply a Triage decision for one orphan or category (spec §4.11).
    /// `Adopt` runs the full Adopt pipeline; every other variant only
    /// touches the manifest.
    pub fn triage(&self, action: TriageAction) -> Result<()> {
        if let TriageAction::Adopt { target, package } = &action {
            self.adopt(package, target)?;
            return Ok(());
        }

        let mut manifest = Manifest::load_or_default(&self.config.manifest_dir, chrono::Utc::now())?;
        doctor::apply_triage(&mut manifest, &action, chrono::Utc::now());
        manifest.touch(chrono::Utc::now());
        manifest.save(&self.config.manifest_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::filesystem::InMemoryFilesystem;
    use std::path::Path;

    #[test]
    fn facade_manages_a_package_end_to_end() {
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
        let dotkeep = Dotkeep::new(&fs, config, guard);

        let report = dotkeep.manage(&["vim".to_string()]).unwrap();
        assert!(report.is_clean());
        assert!(fs.is_symlink(Path::new("/home/user/.vimrc")));

        let report = dotkeep.doctor(true).unwrap();
        assert!(report.results.iter().all(|(_, r)| r.status.is_some()));
    }

    #[test]
    fn facade_fixes_a_broken_managed_link_by_recreating_it() {
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
        let dotkeep = Dotkeep::new(&fs, config, guard);
        dotkeep.manage(&["vim".to_string()]).unwrap();

        fs.remove(Path::new("/home/user/.vimrc")).unwrap();

        let report = dotkeep.doctor(false).unwrap();
        assert_eq!(report.status, crate::doctor::CheckStatus::Fail);

        let outcome = dotkeep.fix(&report).unwrap();
        assert!(outcome.failed.is_empty(), "{:?}", outcome.failed);
        assert!(fs.is_symlink(Path::new("/home/user/.vimrc")));
    }

    #[test]
    fn facade_triage_ignore_category_persists_to_manifest() {
        let fs = InMemoryFilesystem::new();
        fs.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        fs.mkdir_all(Path::new("/home/user"), 0o755).unwrap();
        let config = ConfigBuilder::new("/pkg", "/home/user").build().unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let dotkeep = Dotkeep::new(&fs, config, guard);

        dotkeep
            .triage(crate::doctor::TriageAction::IgnoreCategory {
                category: "language toolchain shims",
                globs: &["rustup", "cargo"],
            })
            .unwrap();

        let manifest = Manifest::load(&dotkeep.config().manifest_dir).unwrap();
        assert!(manifest.ignored.patterns.contains("cargo"));
    }
}
