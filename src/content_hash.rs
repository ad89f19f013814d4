// src/content_hash.rs

//! Deterministic per-package content digest (spec §4.8), built on top of
//! the primitive hasher in `hash`.

use crate::error::Result;
use crate::filesystem::FilesystemPort;
use crate::hash::{Hash, HashAlgorithm, Hasher};
use crate::ignore::IgnoreSet;
use std::path::{Path, PathBuf};

/// One contribution to the folded package digest.
struct Entry {
    relative_path: PathBuf,
    digest: String,
    mode: u32,
}

/// Walks a package directory in deterministic (lexicographic by
/// relative path) order and folds `(relativePath, digest, mode)` tuples
/// into a single stable hash. Symlinks contribute their target string
/// instead of file bytes; empty directories contribute a marker entry
/// so their presence affects the digest.
pub fn hash_package(fs: &dyn FilesystemPort, root: &Path, ignore: &IgnoreSet) -> Result<Hash> {
    let mut entries = Vec::new();
    walk(fs, root, Path::new(""), ignore, &mut entries)?;
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let mut hasher = Hasher::new(HashAlgorithm::Sha256);
    for entry in &entries {
        hasher.update(entry.relative_path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.digest.as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.mode.to_string().as_bytes());
        hasher.update(b"\n");
    }
    Ok(hasher.finalize())
}

fn walk(
    fs: &dyn FilesystemPort,
    abs_dir: &Path,
    rel_dir: &Path,
    ignore: &IgnoreSet,
    out: &mut Vec<Entry>,
) -> Result<()> {
    let mut children = fs.read_dir(abs_dir)?;
    children.sort_by(|a, b| a.name.cmp(&b.name));

    let mut had_retained_child = false;
    for child in children {
        let rel_path = rel_dir.join(&child.name);
        if ignore.matches(&rel_path) {
            continue;
        }
        had_retained_child = true;
        let abs_path = abs_dir.join(&child.name);
        let meta = fs.lstat(&abs_path)?;

        if meta.is_symlink() {
            let target = fs.read_link(&abs_path)?;
            out.push(Entry {
                relative_path: rel_path,
                digest: target.to_string_lossy().to_string(),
                mode: meta.permissions,
            });
        } else if meta.is_dir() {
            walk(fs, &abs_path, &rel_path, ignore, out)?;
        } else {
            let bytes = fs.read_file(&abs_path)?;
            let digest = crate::hash::sha256(&bytes);
            out.push(Entry {
                relative_path: rel_path,
                digest,
                mode: meta.permissions,
            });
        }
    }

    if !had_retained_child && !rel_dir.as_os_str().is_empty() {
        let meta = fs.stat(abs_dir)?;
        out.push(Entry {
            relative_path: rel_dir.to_path_buf(),
            digest: String::new(),
            mode: meta.permissions,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::InMemoryFilesystem;

    #[test]
    fn identical_trees_hash_equal() {
        let fs1 = InMemoryFilesystem::new();
        fs1.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        fs1.write_file(Path::new("/pkg/dot-vimrc"), b"set nu\n", 0o644)
            .unwrap();

        let fs2 = InMemoryFilesystem::new();
        fs2.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        fs2.write_file(Path::new("/pkg/dot-vimrc"), b"set nu\n", 0o644)
            .unwrap();

        let h1 = hash_package(&fs1, Path::new("/pkg"), &IgnoreSet::new()).unwrap();
        let h2 = hash_package(&fs2, Path::new("/pkg"), &IgnoreSet::new()).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn single_byte_edit_changes_digest() {
        let fs = InMemoryFilesystem::new();
        fs.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        fs.write_file(Path::new("/pkg/dot-vimrc"), b"set nu\n", 0o644)
            .unwrap();
        let before = hash_package(&fs, Path::new("/pkg"), &IgnoreSet::new()).unwrap();

        fs.write_file(Path::new("/pkg/dot-vimrc"), b"set nU\n", 0o644)
            .unwrap();
        let after = hash_package(&fs, Path::new("/pkg"), &IgnoreSet::new()).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn empty_directory_affects_digest() {
        let fs = InMemoryFilesystem::new();
        fs.mkdir_all(Path::new("/pkg"), 0o755).unwrap();
        let without_subdir = hash_package(&fs, Path::new("/pkg"), &IgnoreSet::new()).unwrap();

        fs.mkdir_all(Path::new("/pkg/empty"), 0o755).unwrap();
        let with_subdir = hash_package(&fs, Path::new("/pkg"), &IgnoreSet::new()).unwrap();

        assert_ne!(without_subdir, with_subdir);
    }
}
