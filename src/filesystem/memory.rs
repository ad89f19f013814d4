// src/filesystem/memory.rs

//! In-memory `FilesystemPort`, backed by `VfsTree` plus a side table of
//! file content bytes (the tree itself only tracks hash/size metadata).
//! Used by the Planner/Resolver/Executor test suites so they can exercise
//! filesystem semantics without touching real disk.

use super::port::{DirEntry, EntryKind, FilesystemPort, Metadata};
use super::vfs::{NodeKind, VfsTree};
use crate::error::{Error, Result};
use crate::hash::hash_bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct InMemoryFilesystem {
    tree: Mutex<VfsTree>,
    contents: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl Default for InMemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFilesystem {
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(VfsTree::new()),
            contents: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a directory (and its ancestors) for test setup.
    pub fn seed_dir(&self, path: &Path) -> Result<()> {
        self.tree.lock().unwrap().mkdir_p(path)?;
        Ok(())
    }

    /// Seed a file with content for test setup.
    pub fn seed_file(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
        self.write_file(path, bytes, mode)
    }

    fn not_found(path: &Path) -> Error {
        Error::NotFound(path.display().to_string())
    }
}

impl FilesystemPort for InMemoryFilesystem {
    fn stat(&self, path: &Path) -> Result<Metadata> {
        // A "stat" follows a symlink; we don't model link targets as
        // addressable nodes, so treat stat of a symlink as lstat of it.
        self.lstat(path)
    }

    fn lstat(&self, path: &Path) -> Result<Metadata> {
        let tree = self.tree.lock().unwrap();
        let node = tree.get(path)?;
        let (kind, len) = match node.kind() {
            NodeKind::Directory => (EntryKind::Directory, 0),
            NodeKind::File { size, .. } => (EntryKind::File, *size),
            NodeKind::Symlink { target } => (EntryKind::Symlink, target.as_os_str().len() as u64),
        };
        Ok(Metadata {
            kind,
            len,
            permissions: node.permissions(),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let tree = self.tree.lock().unwrap();
        let id = tree.lookup(path).ok_or_else(|| Self::not_found(path))?;
        let node = tree.get_node(id);
        if !node.is_directory() {
            return Err(Error::InvalidPath(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        let mut entries: Vec<DirEntry> = node
            .children()
            .iter()
            .map(|&child_id| {
                let child = tree.get_node(child_id);
                let kind = match child.kind() {
                    NodeKind::Directory => EntryKind::Directory,
                    NodeKind::File { .. } => EntryKind::File,
                    NodeKind::Symlink { .. } => EntryKind::Symlink,
                };
                DirEntry {
                    name: child.name().to_string(),
                    kind,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let tree = self.tree.lock().unwrap();
        let node = tree.get(path)?;
        match node.kind() {
            NodeKind::Symlink { target } => Ok(target.clone()),
            _ => Err(Error::InvalidPath(format!("not a symlink: {}", path.display()))),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        {
            let tree = self.tree.lock().unwrap();
            let node = tree.get(path)?;
            if !node.is_file() {
                return Err(Error::InvalidPath(format!("not a file: {}", path.display())));
            }
        }
        let contents = self.contents.lock().unwrap();
        Ok(contents.get(path).cloned().unwrap_or_default())
    }

    fn write_file(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
        let hash = hash_bytes(bytes).value;
        let mut tree = self.tree.lock().unwrap();
        if tree.exists(path) {
            tree.remove(path)?;
        }
        tree.add_file(path, hash, bytes.len() as u64, mode)?;
        drop(tree);
        self.contents
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn mkdir(&self, path: &Path, mode: u32) -> Result<()> {
        self.tree
            .lock()
            .unwrap()
            .mkdir_with_permissions(path, mode)
            .map(|_| ())
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()> {
        self.tree
            .lock()
            .unwrap()
            .mkdir_p_with_permissions(path, mode)
            .map(|_| ())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree.lock().unwrap();
        let node = tree.get(path)?;
        if node.is_directory() && !node.children().is_empty() {
            return Err(Error::InvalidPath(format!(
                "directory not empty: {}",
                path.display()
            )));
        }
        tree.remove(path)?;
        drop(tree);
        self.contents.lock().unwrap().remove(path);
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree.lock().unwrap();
        let descendants = collect_subtree_paths(&tree, path)?;
        tree.remove(path)?;
        drop(tree);
        let mut contents = self.contents.lock().unwrap();
        for p in descendants {
            contents.remove(&p);
        }
        Ok(())
    }

    fn symlink(&self, old_name: &Path, new_name: &Path) -> Result<()> {
        self.tree
            .lock()
            .unwrap()
            .add_symlink(new_name, old_name)
            .map(|_| ())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut tree = self.tree.lock().unwrap();
        let descendants_before = collect_subtree_paths(&tree, src)?;

        let new_parent = dst
            .parent()
            .ok_or_else(|| Error::InvalidPath("rename destination has no parent".to_string()))?;
        let new_name = dst
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidPath("rename destination has no file name".to_string()))?
            .to_string();

        if tree.exists(dst) {
            return Err(Error::AlreadyExists(dst.display().to_string()));
        }

        tree.reparent_with_rename(src, new_parent, new_name)?;
        let descendants_after = collect_subtree_paths(&tree, dst)?;
        drop(tree);

        if descendants_before.len() == descendants_after.len() {
            let mut contents = self.contents.lock().unwrap();
            for (old, new) in descendants_before.into_iter().zip(descendants_after) {
                if let Some(bytes) = contents.remove(&old) {
                    contents.insert(new, bytes);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.tree.lock().unwrap().exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let tree = self.tree.lock().unwrap();
        tree.lookup(path)
            .map(|id| tree.get_node(id).is_directory())
            .unwrap_or(false)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let tree = self.tree.lock().unwrap();
        tree.lookup(path)
            .map(|id| tree.get_node(id).is_symlink())
            .unwrap_or(false)
    }
}

/// All paths in `path`'s subtree (itself included), in arena order, so
/// renames can move their corresponding content-store entries.
fn collect_subtree_paths(tree: &VfsTree, path: &Path) -> Result<Vec<PathBuf>> {
    let id = tree
        .lookup(path)
        .ok_or_else(|| Error::NotFound(path.display().to_string()))?;
    let mut stack = vec![id];
    let mut paths = Vec::new();
    while let Some(current) = stack.pop() {
        paths.push(tree.get_path(current));
        stack.extend(tree.get_node(current).children().iter().copied());
    }
    Ok(paths)
}
