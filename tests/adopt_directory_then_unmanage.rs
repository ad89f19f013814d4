use dotkeep::config::ConfigBuilder;
use dotkeep::filesystem::{FilesystemPort, RealFilesystem};
use dotkeep::manifest::Manifest;
use dotkeep::safety::ProtectedPaths;
use dotkeep::services::{AdoptService, UnmanageService};
use tempfile::TempDir;

#[test]
fn adopt_directory_then_unmanage_restores_original_tree() {
    let package_root = TempDir::new().unwrap();
    let target_root = TempDir::new().unwrap();
    let fs = RealFilesystem::new();

    let ssh_dir = target_root.path().join(".ssh");
    std::fs::create_dir_all(&ssh_dir).unwrap();
    std::fs::write(ssh_dir.join("config"), b"cfg").unwrap();
    std::fs::write(ssh_dir.join("known_hosts"), b"hosts").unwrap();
    std::fs::write(ssh_dir.join(".hidden"), b"h").unwrap();

    let config = ConfigBuilder::new(package_root.path(), target_root.path())
        .build()
        .unwrap();
    let guard = ProtectedPaths::new(package_root.path().join("cfg"), package_root.path().join("data"));

    let report = AdoptService::new(&fs, &config, &guard)
        .adopt("dot-ssh", &ssh_dir)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report);

    let pkg_dir = package_root.path().join("dot-ssh");
    assert_eq!(std::fs::read(pkg_dir.join("config")).unwrap(), b"cfg");
    assert_eq!(std::fs::read(pkg_dir.join("known_hosts")).unwrap(), b"hosts");
    assert_eq!(std::fs::read(pkg_dir.join("dot-hidden")).unwrap(), b"h");
    assert!(!pkg_dir.join("dot-ssh").exists());

    assert!(fs.is_symlink(&ssh_dir));

    let result = UnmanageService::new(&fs, &config)
        .unmanage(&["dot-ssh".to_string()])
        .unwrap();
    assert!(result.success(), "{:?}", result);

    assert!(!fs.is_symlink(&ssh_dir));
    assert!(ssh_dir.is_dir());
    assert_eq!(std::fs::read(ssh_dir.join("config")).unwrap(), b"cfg");
    assert_eq!(std::fs::read(ssh_dir.join("known_hosts")).unwrap(), b"hosts");
    assert_eq!(std::fs::read(ssh_dir.join(".hidden")).unwrap(), b"h");

    // The package side is still populated — Unmanage copies, never moves.
    assert_eq!(std::fs::read(pkg_dir.join("config")).unwrap(), b"cfg");

    let manifest = Manifest::load(&config.manifest_dir).unwrap();
    assert!(manifest.get_package("dot-ssh").is_none());
}
