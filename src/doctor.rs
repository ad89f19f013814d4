// src/doctor.rs

//! Diagnostics over a managed target directory (spec §4.11): manifest
//! integrity, managed-package health, orphan detection with triage,
//! and a permissions pre-flight. Checks run independently and in
//! parallel; nothing here mutates the filesystem.

use crate::filesystem::FilesystemPort;
use crate::manifest::Manifest;
use crate::path::resolve_relative;
use crate::safety::triage_categories;
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub status: Option<CheckStatus>,
    pub issues: Vec<Issue>,
    pub stats: HashMap<String, usize>,
}

impl CheckResult {
    fn finish(mut self) -> Self {
        let worst = self
            .issues
            .iter()
            .map(|i| match i.severity {
                Severity::Error => CheckStatus::Fail,
                Severity::Warning => CheckStatus::Warn,
                Severity::Info => CheckStatus::Pass,
            })
            .max()
            .unwrap_or(CheckStatus::Pass);
        self.status = Some(worst);
        self
    }
}

pub struct DoctorContext<'a> {
    pub fs: &'a dyn FilesystemPort,
    pub manifest: &'a Manifest,
    pub target_dir: &'a Path,
    pub backup_dir: &'a Path,
}

pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run(&self, ctx: &DoctorContext) -> CheckResult;
}

/// Verifies the manifest itself is internally consistent: every package
/// entry's link count matches its link list, and no two packages claim
/// the same link path.
pub struct ManifestIntegrityCheck;

impl Check for ManifestIntegrityCheck {
    fn name(&self) -> &'static str {
        "manifest-integrity"
    }

    fn description(&self) -> &'static str {
        "checks the persisted manifest is internally consistent"
    }

    fn run(&self, ctx: &DoctorContext) -> CheckResult {
        let mut result = CheckResult::default();
        let mut seen: HashMap<&str, &str> = HashMap::new();

        for (name, info) in &ctx.manifest.packages {
            if info.link_count != info.links.len() {
                result.issues.push(Issue {
                    severity: Severity::Error,
                    message: format!(
                        "package {name}: linkCount {} does not match {} recorded links",
                        info.link_count,
                        info.links.len()
                    ),
                    path: None,
                });
            }
            for link in &info.links {
                if let Some(other) = seen.insert(link.as_str(), name.as_str()) {
                    result.issues.push(Issue {
                        severity: Severity::Error,
                        message: format!("link {link} is claimed by both {other} and {name}"),
                        path: Some(PathBuf::from(link)),
                    });
                }
            }
        }

        result.stats.insert("packages".to_string(), ctx.manifest.packages.len());
        result.finish()
    }
}

/// Verifies every managed package's links still exist on disk and still
/// point at the recorded source.
pub struct ManagedPackageHealthCheck;

impl Check for ManagedPackageHealthCheck {
    fn name(&self) -> &'static str {
        "managed-package-health"
    }

    fn description(&self) -> &'static str {
        "checks every managed package's links are intact"
    }

    fn run(&self, ctx: &DoctorContext) -> CheckResult {
        let mut result = CheckResult::default();
        let mut checked = 0usize;

        for (name, info) in &ctx.manifest.packages {
            for rel in &info.links {
                let target = ctx.target_dir.join(rel);
                checked += 1;
                if !ctx.fs.exists(&target) {
                    result.issues.push(Issue {
                        severity: Severity::Error,
                        message: format!("package {name}: link {rel} is missing"),
                        path: Some(target),
                    });
                    continue;
                }
                if !ctx.fs.is_symlink(&target) {
                    result.issues.push(Issue {
                        severity: Severity::Error,
                        message: format!("package {name}: {rel} is no longer a symlink"),
                        path: Some(target),
                    });
                } else if let Ok(raw) = ctx.fs.read_link(&target) {
                    let link_dir = target.parent().unwrap_or(ctx.target_dir);
                    let pointee = resolve_relative(link_dir, &raw);
                    if !ctx.fs.exists(&pointee) {
                        result.issues.push(Issue {
                            severity: Severity::Warning,
                            message: format!(
                                "package {name}: link {rel} points at missing source {}",
                                pointee.display()
                            ),
                            path: Some(target),
                        });
                    }
                }
            }
        }

        result.stats.insert("links_checked".to_string(), checked);
        result.finish()
    }
}

/// Scans the target directory for symlinks the manifest doesn't know
/// about, and buckets them by confidence via the Triage table.
pub struct OrphanedLinksCheck;

impl OrphanedLinksCheck {
    fn known_links(manifest: &Manifest, target_dir: &Path) -> HashSet<PathBuf> {
        manifest
            .packages
            .values()
            .flat_map(|info| info.links.iter())
            .map(|rel| target_dir.join(rel))
            .collect()
    }

    fn walk(fs: &dyn FilesystemPort, dir: &Path, skip: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = fs.read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = dir.join(&entry.name);
            if path == *skip {
                continue;
            }
            if fs.is_symlink(&path) {
                out.push(path);
            } else if fs.is_dir(&path) {
                Self::walk(fs, &path, skip, out);
            }
        }
    }
}

impl Check for OrphanedLinksCheck {
    fn name(&self) -> &'static str {
        "orphaned-links"
    }

    fn description(&self) -> &'static str {
        "finds symlinks in the target directory the manifest doesn't own"
    }

    fn run(&self, ctx: &DoctorContext) -> CheckResult {
        let mut result = CheckResult::default();
        let known = Self::known_links(ctx.manifest, ctx.target_dir);
        let categories = triage_categories();

        let mut found = Vec::new();
        Self::walk(ctx.fs, ctx.target_dir, ctx.backup_dir, &mut found);

        let mut broken = 0usize;
        let mut live = 0usize;

        for path in found {
            if known.contains(&path) {
                continue;
            }
            let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let category = categories
                .iter()
                .find(|c| c.matches(basename))
                .map(|c| c.name)
                .unwrap_or("unknown");

            match ctx.fs.read_link(&path) {
                Ok(raw) => {
                    let link_dir = path.parent().unwrap_or(ctx.target_dir);
                    let resolved = resolve_relative(link_dir, &raw);
                    if ctx.fs.exists(&resolved) {
                        live += 1;
                        // A live orphan is still unmanaged drift, regardless of
                        // how confidently Triage can categorize it — only a
                        // broken link (unusable either way) is an Error.
                        result.issues.push(Issue {
                            severity: Severity::Warning,
                            message: format!("unmanaged link (category: {category})"),
                            path: Some(path),
                        });
                    } else {
                        broken += 1;
                        result.issues.push(Issue {
                            severity: Severity::Error,
                            message: format!(
                                "broken orphan link (category: {category}) pointing at missing {}",
                                resolved.display()
                            ),
                            path: Some(path),
                        });
                    }
                }
                Err(_) => {}
            }
        }

        result.stats.insert("broken".to_string(), broken);
        result.stats.insert("live".to_string(), live);
        result.finish()
    }
}

/// Placeholder check: verifies the process is running on a platform the
/// rest of the core assumes (POSIX-style permission bits, symlinks).
pub struct PlatformCompatibilityCheck;

impl Check for PlatformCompatibilityCheck {
    fn name(&self) -> &'static str {
        "platform-compatibility"
    }

    fn description(&self) -> &'static str {
        "checks the host platform supports POSIX symlinks and permission bits"
    }

    fn run(&self, _ctx: &DoctorContext) -> CheckResult {
        let mut result = CheckResult::default();
        if !cfg!(unix) {
            result.issues.push(Issue {
                severity: Severity::Error,
                message: "non-POSIX platform: permission bits and symlink semantics are unsupported".to_string(),
                path: None,
            });
        }
        result.finish()
    }
}

/// Verifies the target directory and every managed package's parent
/// directories are writable before a real run is attempted.
pub struct PermissionsPreflightCheck;

impl Check for PermissionsPreflightCheck {
    fn name(&self) -> &'static str {
        "permissions-preflight"
    }

    fn description(&self) -> &'static str {
        "checks the target directory tree is writable"
    }

    fn run(&self, ctx: &DoctorContext) -> CheckResult {
        let mut result = CheckResult::default();
        let mut dirs: HashSet<PathBuf> = HashSet::new();
        for info in ctx.manifest.packages.values() {
            for rel in &info.links {
                if let Some(parent) = ctx.target_dir.join(rel).parent() {
                    dirs.insert(parent.to_path_buf());
                }
            }
        }
        dirs.insert(ctx.target_dir.to_path_buf());

        for dir in dirs {
            match ctx.fs.stat(&dir) {
                Ok(meta) if meta.permissions & 0o200 == 0 => {
                    result.issues.push(Issue {
                        severity: Severity::Warning,
                        message: "directory is not writable by its owner".to_string(),
                        path: Some(dir),
                    });
                }
                Err(_) => {
                    result.issues.push(Issue {
                        severity: Severity::Error,
                        message: "directory is missing".to_string(),
                        path: Some(dir),
                    });
                }
                _ => {}
            }
        }
        result.finish()
    }
}

pub fn standard_checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(ManifestIntegrityCheck),
        Box::new(ManagedPackageHealthCheck),
        Box::new(OrphanedLinksCheck),
        Box::new(PlatformCompatibilityCheck),
        Box::new(PermissionsPreflightCheck),
    ]
}

/// Run every check in parallel and collect results keyed by check name.
pub fn run_all(ctx: &DoctorContext, checks: &[Box<dyn Check>]) -> Vec<(&'static str, CheckResult)> {
    checks.par_iter().map(|check| (check.name(), check.run(ctx))).collect()
}

/// Aggregated outcome of a full Doctor run: worst-of-three status,
/// every issue from every check, and summed stats, alongside the
/// individual per-check results (spec §4.11).
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub status: CheckStatus,
    pub issues: Vec<Issue>,
    pub stats: HashMap<String, usize>,
    pub results: Vec<(&'static str, CheckResult)>,
}

pub fn diagnose(ctx: &DoctorContext, checks: &[Box<dyn Check>]) -> DiagnosticReport {
    let results = run_all(ctx, checks);
    let mut status = CheckStatus::Pass;
    let mut issues = Vec::new();
    let mut stats: HashMap<String, usize> = HashMap::new();

    for (_, result) in &results {
        if let Some(s) = result.status {
            status = status.max(s);
        }
        issues.extend(result.issues.iter().cloned());
        for (key, value) in &result.stats {
            *stats.entry(key.clone()).or_insert(0) += value;
        }
    }

    DiagnosticReport { status, issues, stats, results }
}

/// A corrective action Fix can take for one broken link (spec §4.11).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixAction {
    /// The package's source file is still present; rerun Manage for it
    /// so the usual pipeline recreates the link.
    RecreateManaged { package: String },
    /// The package's source is gone too; drop the dangling link and
    /// remove it from the package's manifest entry.
    DeleteManagedLink { package: String, rel: String, target: PathBuf },
    /// An unmanaged, broken orphan link — just delete it.
    DeleteUnmanagedLink { target: PathBuf },
}

/// Categorize every broken link a diagnostic run found into a concrete
/// `FixAction`, per spec §4.11: a managed link recreates from its
/// package when the package's source still exists, otherwise it (and
/// its manifest record) is dropped; an unmanaged broken orphan is
/// simply deleted.
pub fn plan_fixes(ctx: &DoctorContext, report: &DiagnosticReport) -> Vec<FixAction> {
    let mut actions = Vec::new();
    if report.status == CheckStatus::Pass {
        return actions;
    }

    let mut recreate_queued: HashSet<String> = HashSet::new();
    for (name, info) in &ctx.manifest.packages {
        for rel in &info.links {
            let target = ctx.target_dir.join(rel);
            let broken = !link_is_healthy(ctx.fs, ctx.target_dir, &target);
            if !broken {
                continue;
            }
            let stored = crate::dotfile::to_stored(Path::new(rel));
            let source = PathBuf::from(&info.package_dir).join(&stored);
            if ctx.fs.exists(&source) {
                if recreate_queued.insert(name.clone()) {
                    actions.push(FixAction::RecreateManaged { package: name.clone() });
                }
            } else {
                actions.push(FixAction::DeleteManagedLink {
                    package: name.clone(),
                    rel: rel.clone(),
                    target,
                });
            }
        }
    }

    let known = OrphanedLinksCheck::known_links(ctx.manifest, ctx.target_dir);
    let mut found = Vec::new();
    OrphanedLinksCheck::walk(ctx.fs, ctx.target_dir, ctx.backup_dir, &mut found);
    for path in found {
        if known.contains(&path) {
            continue;
        }
        if !link_is_healthy(ctx.fs, ctx.target_dir, &path) {
            actions.push(FixAction::DeleteUnmanagedLink { target: path });
        }
    }

    actions
}

fn link_is_healthy(fs: &dyn FilesystemPort, target_dir: &Path, target: &Path) -> bool {
    if !fs.exists(target) || !fs.is_symlink(target) {
        return false;
    }
    match fs.read_link(target) {
        Ok(raw) => {
            let link_dir = target.parent().unwrap_or(target_dir);
            fs.exists(&resolve_relative(link_dir, &raw))
        }
        Err(_) => false,
    }
}

/// A user decision on one orphan Triage category or link (spec §4.11).
#[derive(Debug, Clone)]
pub enum TriageAction {
    /// Ignore every link matching a whole category's glob patterns —
    /// persists the category's patterns into the manifest's ignored set.
    IgnoreCategory {
        category: &'static str,
        globs: &'static [&'static str],
    },
    /// Ignore one specific orphan link.
    IgnoreLink { target: PathBuf, reason: String },
    /// Adopt one orphan link into a package (handled by the facade,
    /// which has access to `AdoptService`).
    Adopt { target: PathBuf, package: String },
    /// Leave the orphan as-is.
    Skip,
}

/// Apply a `TriageAction` that only needs manifest state (`IgnoreCategory`,
/// `IgnoreLink`, `Skip`) — `Adopt` is a no-op here and must be handled by
/// the caller, which runs the full Adopt pipeline and then persists.
pub fn apply_triage(
    manifest: &mut Manifest,
    action: &TriageAction,
    now: chrono::DateTime<chrono::Utc>,
) {
    match action {
        TriageAction::IgnoreCategory { globs, .. } => {
            manifest.ignored.patterns.extend(globs.iter().map(|g| g.to_string()));
        }
        TriageAction::IgnoreLink { target, reason } => {
            manifest.ignored.links.insert(
                target.display().to_string(),
                crate::manifest::IgnoredLink {
                    source: target.display().to_string(),
                    reason: reason.clone(),
                    added_at: now,
                },
            );
        }
        TriageAction::Adopt { .. } | TriageAction::Skip => {}
    }
}
