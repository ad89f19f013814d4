use dotkeep::config::ConfigBuilder;
use dotkeep::filesystem::{FilesystemPort, RealFilesystem};
use dotkeep::manifest::Manifest;
use dotkeep::safety::ProtectedPaths;
use dotkeep::services::{ManageService, RemanageService};
use tempfile::TempDir;

#[test]
fn remanage_unchanged_package_is_a_no_op() {
    let package_root = TempDir::new().unwrap();
    let target_root = TempDir::new().unwrap();
    let fs = RealFilesystem::new();

    std::fs::create_dir_all(package_root.path().join("p")).unwrap();
    std::fs::write(package_root.path().join("p/dot-x"), b"x").unwrap();
    std::fs::write(target_root.path().join(".bashrc"), b"").unwrap();

    let config = ConfigBuilder::new(package_root.path(), target_root.path())
        .package_name_mapping(false)
        .build()
        .unwrap();
    let guard = ProtectedPaths::new(package_root.path().join("cfg"), package_root.path().join("data"));

    ManageService::new(&fs, &config, &guard)
        .manage(&["p".to_string()])
        .unwrap();
    let before = Manifest::load(&config.manifest_dir).unwrap();
    let info_before = before.get_package("p").unwrap().clone();

    let link = target_root.path().join(".x");
    let link_target_before = fs.read_link(&link).unwrap();

    let report = RemanageService::new(&fs, &config, &guard)
        .remanage(&["p".to_string()])
        .unwrap();

    assert_eq!(report.unchanged, vec!["p".to_string()]);
    assert!(report.changed.is_empty());
    assert!(report.result.is_none());

    let after = Manifest::load(&config.manifest_dir).unwrap();
    let info_after = after.get_package("p").unwrap();
    assert_eq!(info_before.hash, info_after.hash);
    assert_eq!(info_before.links, info_after.links);
    assert_eq!(fs.read_link(&link).unwrap(), link_target_before);
}
