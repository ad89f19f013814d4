use dotkeep::config::ConfigBuilder;
use dotkeep::doctor::{run_all, standard_checks, DoctorContext, Severity};
use dotkeep::filesystem::{FilesystemPort, RealFilesystem};
use dotkeep::manifest::Manifest;
use dotkeep::safety::ProtectedPaths;
use dotkeep::services::ManageService;
use tempfile::TempDir;

#[test]
fn doctor_reports_orphans_with_broken_vs_live_triage() {
    let package_root = TempDir::new().unwrap();
    let target_root = TempDir::new().unwrap();
    let real_file = TempDir::new().unwrap();
    let fs = RealFilesystem::new();

    std::fs::create_dir_all(package_root.path().join("a")).unwrap();
    std::fs::write(package_root.path().join("a/dot-cfg"), b"cfg").unwrap();
    std::fs::write(real_file.path().join("file"), b"real").unwrap();
    // A non-empty target directory keeps the directory-folding heuristic
    // from collapsing the whole (otherwise-empty) target dir into one link.
    std::fs::write(target_root.path().join(".bashrc"), b"").unwrap();

    let config = ConfigBuilder::new(package_root.path(), target_root.path())
        .package_name_mapping(false)
        .build()
        .unwrap();
    let guard = ProtectedPaths::new(package_root.path().join("cfg"), package_root.path().join("data"));

    let report = ManageService::new(&fs, &config, &guard)
        .manage(&["a".to_string()])
        .unwrap();
    assert!(report.is_clean(), "{:?}", report);

    fs.symlink(
        std::path::Path::new("/nowhere/at/all"),
        &target_root.path().join(".orphan-broken"),
    )
    .unwrap();
    fs.symlink(
        &real_file.path().join("file"),
        &target_root.path().join(".orphan-ok"),
    )
    .unwrap();

    let manifest = Manifest::load(&config.manifest_dir).unwrap();
    let ctx = DoctorContext {
        fs: &fs,
        manifest: &manifest,
        target_dir: target_root.path(),
        backup_dir: &config.backup_dir,
    };

    let results = run_all(&ctx, &standard_checks());
    let orphan_result = results
        .iter()
        .find(|(name, _)| *name == "orphaned-links")
        .map(|(_, result)| result)
        .expect("orphaned-links check ran");

    assert_eq!(orphan_result.stats.get("broken"), Some(&1));
    assert_eq!(orphan_result.stats.get("live"), Some(&1));
    assert_eq!(orphan_result.issues.len(), 2);

    let broken_issue = orphan_result
        .issues
        .iter()
        .find(|i| i.path.as_deref() == Some(target_root.path().join(".orphan-broken").as_path()))
        .expect("broken orphan issue present");
    assert_eq!(broken_issue.severity, Severity::Error);

    let live_issue = orphan_result
        .issues
        .iter()
        .find(|i| i.path.as_deref() == Some(target_root.path().join(".orphan-ok").as_path()))
        .expect("live orphan issue present");
    assert_eq!(live_issue.severity, Severity::Warning);
}
