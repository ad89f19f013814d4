// src/filesystem/real.rs

//! Real-OS backed `FilesystemPort`.

use super::port::{DirEntry, EntryKind, FilesystemPort, Metadata};
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl RealFilesystem {
    pub fn new() -> Self {
        Self
    }
}

fn to_metadata(meta: fs::Metadata) -> Metadata {
    let kind = if meta.file_type().is_symlink() {
        EntryKind::Symlink
    } else if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    Metadata {
        kind,
        len: meta.len(),
        permissions: meta.permissions().mode() & 0o7777,
    }
}

fn map_io_err(path: &Path, e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        io::ErrorKind::AlreadyExists => Error::AlreadyExists(path.display().to_string()),
        io::ErrorKind::PermissionDenied => Error::PermissionDenied {
            path: path.to_path_buf(),
            op: "fs".to_string(),
        },
        _ => Error::Io(e),
    }
}

/// Cross-device-safe rename: `fs::rename` first, falling back to
/// copy+fsync+remove when the source and destination are on different
/// filesystems (EXDEV). Directories are copied recursively.
fn move_atomic(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            let meta = fs::symlink_metadata(src).map_err(|e| map_io_err(src, e))?;
            if meta.is_dir() {
                copy_dir_recursive(src, dst)?;
                fs::remove_dir_all(src).map_err(|e| map_io_err(src, e))?;
            } else if meta.file_type().is_symlink() {
                let target = fs::read_link(src).map_err(|e| map_io_err(src, e))?;
                std::os::unix::fs::symlink(&target, dst).map_err(|e| map_io_err(dst, e))?;
                fs::remove_file(src).map_err(|e| map_io_err(src, e))?;
            } else {
                let mut reader = fs::File::open(src).map_err(|e| map_io_err(src, e))?;
                let mut writer = fs::File::create(dst).map_err(|e| map_io_err(dst, e))?;
                io::copy(&mut reader, &mut writer).map_err(|e| map_io_err(dst, e))?;
                writer.sync_all().map_err(|e| map_io_err(dst, e))?;
                fs::set_permissions(dst, fs::Permissions::from_mode(meta.permissions().mode()))
                    .map_err(|e| map_io_err(dst, e))?;
                fs::remove_file(src).map_err(|e| map_io_err(src, e))?;
            }
            Ok(())
        }
        Err(e) => Err(map_io_err(src, e)),
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| map_io_err(dst, e))?;
    let perm = fs::metadata(src).map_err(|e| map_io_err(src, e))?.permissions();
    fs::set_permissions(dst, perm).map_err(|e| map_io_err(dst, e))?;

    for entry in fs::read_dir(src).map_err(|e| map_io_err(src, e))? {
        let entry = entry.map_err(|e| map_io_err(src, e))?;
        let file_type = entry.file_type().map_err(|e| map_io_err(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if file_type.is_symlink() {
            let target = fs::read_link(&from).map_err(|e| map_io_err(&from, e))?;
            std::os::unix::fs::symlink(&target, &to).map_err(|e| map_io_err(&to, e))?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| map_io_err(&to, e))?;
            let mode = fs::metadata(&from).map_err(|e| map_io_err(&from, e))?.permissions();
            fs::set_permissions(&to, mode).map_err(|e| map_io_err(&to, e))?;
        }
    }
    Ok(())
}

impl FilesystemPort for RealFilesystem {
    fn stat(&self, path: &Path) -> Result<Metadata> {
        fs::metadata(path).map(to_metadata).map_err(|e| map_io_err(path, e))
    }

    fn lstat(&self, path: &Path) -> Result<Metadata> {
        fs::symlink_metadata(path)
            .map(to_metadata)
            .map_err(|e| map_io_err(path, e))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| map_io_err(path, e))? {
            let entry = entry.map_err(|e| map_io_err(path, e))?;
            let file_type = entry.file_type().map_err(|e| map_io_err(path, e))?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).map_err(|e| map_io_err(path, e))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| map_io_err(path, e))
    }

    fn write_file(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
        fs::write(path, bytes).map_err(|e| map_io_err(path, e))?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| map_io_err(path, e))?;
        Ok(())
    }

    fn mkdir(&self, path: &Path, mode: u32) -> Result<()> {
        fs::create_dir(path).map_err(|e| map_io_err(path, e))?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| map_io_err(path, e))?;
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| map_io_err(path, e))?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| map_io_err(path, e))?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| map_io_err(path, e))?;
        if meta.file_type().is_symlink() || !meta.is_dir() {
            fs::remove_file(path).map_err(|e| map_io_err(path, e))
        } else {
            fs::remove_dir(path).map_err(|e| map_io_err(path, e))
        }
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| map_io_err(path, e))?;
        if meta.is_dir() && !meta.file_type().is_symlink() {
            fs::remove_dir_all(path).map_err(|e| map_io_err(path, e))
        } else {
            fs::remove_file(path).map_err(|e| map_io_err(path, e))
        }
    }

    fn symlink(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        std::os::unix::fs::symlink(old_name, new_name).map_err(|e| map_io_err(new_name, e))
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        move_atomic(src, dst)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let fs_port = RealFilesystem::new();
        let path = dir.path().join("f.txt");

        fs_port.write_file(&path, b"hello", 0o640).unwrap();
        assert_eq!(fs_port.read_file(&path).unwrap(), b"hello");
        assert_eq!(fs_port.stat(&path).unwrap().permissions, 0o640);
    }

    #[test]
    fn symlink_reports_as_symlink_and_reads_back_verbatim() {
        let dir = TempDir::new().unwrap();
        let fs_port = RealFilesystem::new();
        let target = dir.path().join("nonexistent-target");
        let link = dir.path().join("link");

        fs_port.symlink(&target, &link).unwrap();
        assert!(fs_port.is_symlink(&link));
        assert_eq!(fs_port.read_link(&link).unwrap(), target);
    }

    #[test]
    fn remove_does_not_follow_symlink() {
        let dir = TempDir::new().unwrap();
        let fs_port = RealFilesystem::new();
        let real_file = dir.path().join("real.txt");
        fs_port.write_file(&real_file, b"data", 0o644).unwrap();
        let link = dir.path().join("link");
        fs_port.symlink(&real_file, &link).unwrap();

        fs_port.remove(&link).unwrap();
        assert!(!fs_port.exists(&link));
        assert!(fs_port.exists(&real_file));
    }

    #[test]
    fn rename_moves_directory_subtree() {
        let dir = TempDir::new().unwrap();
        let fs_port = RealFilesystem::new();
        let src = dir.path().join("a");
        let dst = dir.path().join("c");
        fs_port.mkdir_all(&src.join("b"), 0o755).unwrap();
        fs_port.write_file(&src.join("b").join("x"), b"x", 0o644).unwrap();

        fs_port.rename(&src, &dst).unwrap();

        assert!(fs_port.exists(&dst.join("b").join("x")));
        assert!(!fs_port.exists(&src));
    }
}
