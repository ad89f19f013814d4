// src/filesystem/port.rs

//! The Filesystem Port: a narrow capability surface over a hierarchical
//! POSIX-shaped namespace, implemented once for the real OS and once
//! in-memory for tests. See `RealFilesystem` and `InMemoryFilesystem`.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// The kind of filesystem entry, as reported by `stat`/`lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: EntryKind,
    pub len: u64,
    pub permissions: u32,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Abstract filesystem contract. Every method is synchronous; long-running
/// callers (DirCopy, DirRemoveAll, the content hasher) are expected to
/// check cancellation between entries at a layer above this trait.
///
/// Invariants every implementation must uphold (spec §4.1):
/// - `rename` of a directory moves the entire subtree atomically from the
///   caller's point of view.
/// - `symlink` creates a link that `lstat` reports as a symlink and that
///   `read_link` returns verbatim (no normalization).
/// - `remove` removes symlinks as entries; it never follows them.
/// - `write_file` preserves the requested permission bits on create.
pub trait FilesystemPort: Send + Sync {
    fn stat(&self, path: &Path) -> Result<Metadata>;
    fn lstat(&self, path: &Path) -> Result<Metadata>;
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
    fn read_link(&self, path: &Path) -> Result<PathBuf>;
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_file(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()>;
    fn mkdir(&self, path: &Path, mode: u32) -> Result<()>;
    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()>;
    fn remove(&self, path: &Path) -> Result<()>;
    fn remove_all(&self, path: &Path) -> Result<()>;
    fn symlink(&self, old_name: &Path, new_name: &Path) -> Result<()>;
    fn rename(&self, src: &Path, dst: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_symlink(&self, path: &Path) -> bool;
}
