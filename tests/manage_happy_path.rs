use dotkeep::config::ConfigBuilder;
use dotkeep::filesystem::{FilesystemPort, RealFilesystem};
use dotkeep::manifest::{Manifest, PackageSource};
use dotkeep::safety::ProtectedPaths;
use dotkeep::services::ManageService;
use tempfile::TempDir;

#[test]
fn manage_creates_symlink_and_records_manifest_entry() {
    let package_root = TempDir::new().unwrap();
    let target_root = TempDir::new().unwrap();
    let fs = RealFilesystem::new();

    std::fs::create_dir_all(package_root.path().join("vim")).unwrap();
    std::fs::write(package_root.path().join("vim/dot-vimrc"), b"set nu\n").unwrap();
    // A non-empty target directory keeps the directory-folding heuristic
    // from collapsing the whole (otherwise-empty) target dir into one link.
    std::fs::write(target_root.path().join(".bashrc"), b"").unwrap();

    let config = ConfigBuilder::new(package_root.path(), target_root.path())
        .package_name_mapping(false)
        .build()
        .unwrap();
    let guard = ProtectedPaths::new(package_root.path().join("cfg"), package_root.path().join("data"));

    let report = ManageService::new(&fs, &config, &guard)
        .manage(&["vim".to_string()])
        .unwrap();
    assert!(report.is_clean());

    let link = target_root.path().join(".vimrc");
    assert!(fs.is_symlink(&link));
    assert_eq!(fs.read_file(&link).unwrap(), b"set nu\n");

    let manifest = Manifest::load(&config.manifest_dir).unwrap();
    let info = manifest.get_package("vim").unwrap();
    assert_eq!(info.links, vec![".vimrc".to_string()]);
    assert_eq!(info.link_count, 1);
    assert_eq!(info.source, PackageSource::Managed);
    assert!(!info.hash.is_empty());
}
