use dotkeep::config::ConfigBuilder;
use dotkeep::filesystem::{FilesystemPort, RealFilesystem};
use dotkeep::manifest::Manifest;
use dotkeep::safety::ProtectedPaths;
use dotkeep::services::ManageService;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

#[test]
fn manage_backs_up_conflicting_file_before_linking() {
    let package_root = TempDir::new().unwrap();
    let target_root = TempDir::new().unwrap();
    let backup_root = TempDir::new().unwrap();
    let fs = RealFilesystem::new();

    std::fs::create_dir_all(package_root.path().join("vim")).unwrap();
    std::fs::write(package_root.path().join("vim/dot-vimrc"), b"new").unwrap();
    std::fs::write(target_root.path().join(".vimrc"), b"old").unwrap();
    std::fs::set_permissions(target_root.path().join(".vimrc"), std::fs::Permissions::from_mode(0o640))
        .unwrap();

    let config = ConfigBuilder::new(package_root.path(), target_root.path())
        .package_name_mapping(false)
        .backup(true)
        .backup_dir(backup_root.path())
        .build()
        .unwrap();
    let guard = ProtectedPaths::new(package_root.path().join("cfg"), package_root.path().join("data"));

    let report = ManageService::new(&fs, &config, &guard)
        .manage(&["vim".to_string()])
        .unwrap();
    assert!(report.is_clean(), "{:?}", report);

    let link = target_root.path().join(".vimrc");
    assert!(fs.is_symlink(&link));
    assert_eq!(fs.read_file(&link).unwrap(), b"new");

    let manifest = Manifest::load(&config.manifest_dir).unwrap();
    let info = manifest.get_package("vim").unwrap();
    let backup_path = info.backups.get(".vimrc").expect("backup recorded for .vimrc");
    let backup_bytes = std::fs::read(backup_path).unwrap();
    assert_eq!(backup_bytes, b"old");
    let backup_mode = std::fs::metadata(backup_path).unwrap().permissions().mode() & 0o777;
    assert_eq!(backup_mode, 0o640);
}
