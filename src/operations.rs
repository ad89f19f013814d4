// src/operations.rs

//! The `Operation` closed sum type (spec §3, §4.10): concrete mutations
//! with `validate`/`execute`/`rollback` semantics. An `Operation` is
//! immutable once built; state captured during `execute` needed to
//! drive `rollback` (e.g. a deleted link's prior target) is returned
//! as a separate `RollbackState` that the Executor's checkpoint holds
//! alongside the operation, rather than mutating the operation itself.

use crate::error::{Error, Result};
use crate::filesystem::FilesystemPort;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    LinkCreate,
    LinkDelete,
    DirCreate,
    DirDelete,
    DirCopy,
    DirRemoveAll,
    FileMove,
    FileBackup,
    FileDelete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkCreate => "LinkCreate",
            Self::LinkDelete => "LinkDelete",
            Self::DirCreate => "DirCreate",
            Self::DirDelete => "DirDelete",
            Self::DirCopy => "DirCopy",
            Self::DirRemoveAll => "DirRemoveAll",
            Self::FileMove => "FileMove",
            Self::FileBackup => "FileBackup",
            Self::FileDelete => "FileDelete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    LinkCreate { source: PathBuf, target: PathBuf },
    LinkDelete { target: PathBuf },
    DirCreate { path: PathBuf },
    DirDelete { path: PathBuf },
    DirCopy { source: PathBuf, dest: PathBuf },
    DirRemoveAll { path: PathBuf },
    FileMove { source: PathBuf, dest: PathBuf },
    FileBackup { source: PathBuf, backup_dest: PathBuf },
    FileDelete { path: PathBuf },
}

/// State captured by `execute` that `rollback` needs to reverse the
/// mutation. Most operations carry enough information in their own
/// fields and need `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackState {
    None,
    PriorSymlinkTarget(PathBuf),
    PriorPermissions(u32),
}

#[derive(Debug, Clone)]
pub struct Operation {
    id: String,
    payload: OperationPayload,
}

impl PartialEq for Operation {
    /// Structural equality over positional fields, excluding the
    /// free-form `OperationID` (spec §4.10).
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Operation {
    pub fn new(id: impl Into<String>, payload: OperationPayload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    pub fn kind(&self) -> OperationKind {
        match &self.payload {
            OperationPayload::LinkCreate { .. } => OperationKind::LinkCreate,
            OperationPayload::LinkDelete { .. } => OperationKind::LinkDelete,
            OperationPayload::DirCreate { .. } => OperationKind::DirCreate,
            OperationPayload::DirDelete { .. } => OperationKind::DirDelete,
            OperationPayload::DirCopy { .. } => OperationKind::DirCopy,
            OperationPayload::DirRemoveAll { .. } => OperationKind::DirRemoveAll,
            OperationPayload::FileMove { .. } => OperationKind::FileMove,
            OperationPayload::FileBackup { .. } => OperationKind::FileBackup,
            OperationPayload::FileDelete { .. } => OperationKind::FileDelete,
        }
    }

    pub fn equals(&self, other: &Operation) -> bool {
        self == other
    }

    pub fn describe(&self) -> String {
        match &self.payload {
            OperationPayload::LinkCreate { source, target } => {
                format!("link {} -> {}", target.display(), source.display())
            }
            OperationPayload::LinkDelete { target } => format!("unlink {}", target.display()),
            OperationPayload::DirCreate { path } => format!("mkdir {}", path.display()),
            OperationPayload::DirDelete { path } => format!("rmdir {}", path.display()),
            OperationPayload::DirCopy { source, dest } => {
                format!("copy dir {} -> {}", source.display(), dest.display())
            }
            OperationPayload::DirRemoveAll { path } => format!("remove tree {}", path.display()),
            OperationPayload::FileMove { source, dest } => {
                format!("move {} -> {}", source.display(), dest.display())
            }
            OperationPayload::FileBackup { source, backup_dest } => {
                format!("backup {} -> {}", source.display(), backup_dest.display())
            }
            OperationPayload::FileDelete { path } => format!("delete {}", path.display()),
        }
    }

    /// Paths this operation reads from or writes to, used by the Sort
    /// stage to compute dependency ordering and path-prefix overlap.
    pub fn touched_paths(&self) -> Vec<&Path> {
        match &self.payload {
            OperationPayload::LinkCreate { source, target } => vec![source, target],
            OperationPayload::LinkDelete { target } => vec![target],
            OperationPayload::DirCreate { path } => vec![path],
            OperationPayload::DirDelete { path } => vec![path],
            OperationPayload::DirCopy { source, dest } => vec![source, dest],
            OperationPayload::DirRemoveAll { path } => vec![path],
            OperationPayload::FileMove { source, dest } => vec![source, dest],
            OperationPayload::FileBackup { source, backup_dest } => vec![source, backup_dest],
            OperationPayload::FileDelete { path } => vec![path],
        }
    }

    /// The path this operation produces, if any — used by the sorter to
    /// order a `FileMove`/`DirCreate` ahead of operations that need the
    /// destination to exist.
    pub fn produces(&self) -> Option<&Path> {
        match &self.payload {
            OperationPayload::DirCreate { path } => Some(path),
            OperationPayload::FileMove { dest, .. } => Some(dest),
            OperationPayload::DirCopy { dest, .. } => Some(dest),
            OperationPayload::FileBackup { backup_dest, .. } => Some(backup_dest),
            OperationPayload::LinkCreate { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Structural precondition check. Never touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        let empty = |p: &Path| p.as_os_str().is_empty();
        match &self.payload {
            OperationPayload::LinkCreate { source, target } => {
                if empty(source) || empty(target) {
                    return Err(Error::InvalidPath("LinkCreate requires non-empty paths".into()));
                }
                if source == target {
                    return Err(Error::InvalidPath("LinkCreate source equals target".into()));
                }
            }
            OperationPayload::LinkDelete { target } if empty(target) => {
                return Err(Error::InvalidPath("LinkDelete requires a target path".into()));
            }
            OperationPayload::DirCreate { path } | OperationPayload::DirDelete { path }
                if empty(path) =>
            {
                return Err(Error::InvalidPath("directory operation requires a path".into()));
            }
            OperationPayload::DirCopy { source, dest } if empty(source) || empty(dest) => {
                return Err(Error::InvalidPath("DirCopy requires non-empty paths".into()));
            }
            OperationPayload::DirRemoveAll { path } if empty(path) => {
                return Err(Error::InvalidPath("DirRemoveAll requires a path".into()));
            }
            OperationPayload::FileMove { source, dest } if empty(source) || empty(dest) => {
                return Err(Error::InvalidPath("FileMove requires non-empty paths".into()));
            }
            OperationPayload::FileBackup { source, backup_dest }
                if empty(source) || empty(backup_dest) =>
            {
                return Err(Error::InvalidPath("FileBackup requires non-empty paths".into()));
            }
            OperationPayload::FileDelete { path } if empty(path) => {
                return Err(Error::InvalidPath("FileDelete requires a path".into()));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn execute(&self, fs: &dyn FilesystemPort) -> Result<RollbackState> {
        match &self.payload {
            OperationPayload::LinkCreate { source, target } => {
                fs.symlink(source, target)?;
                Ok(RollbackState::None)
            }
            OperationPayload::LinkDelete { target } => {
                let prior = fs.read_link(target)?;
                fs.remove(target)?;
                Ok(RollbackState::PriorSymlinkTarget(prior))
            }
            OperationPayload::DirCreate { path } => {
                fs.mkdir(path, 0o755)?;
                Ok(RollbackState::None)
            }
            OperationPayload::DirDelete { path } => {
                let perm = fs.stat(path)?.permissions;
                fs.remove(path)?;
                Ok(RollbackState::PriorPermissions(perm))
            }
            OperationPayload::DirCopy { source, dest } => {
                copy_dir_recursive(fs, source, dest)?;
                Ok(RollbackState::None)
            }
            OperationPayload::DirRemoveAll { path } => {
                fs.remove_all(path)?;
                Ok(RollbackState::None)
            }
            OperationPayload::FileMove { source, dest } => {
                fs.rename(source, dest)?;
                Ok(RollbackState::None)
            }
            OperationPayload::FileBackup { source, backup_dest } => {
                let meta = fs.stat(source)?;
                let bytes = fs.read_file(source)?;
                if let Some(parent) = backup_dest.parent() {
                    fs.mkdir_all(parent, 0o755)?;
                }
                fs.write_file(backup_dest, &bytes, meta.permissions)?;
                Ok(RollbackState::None)
            }
            OperationPayload::FileDelete { path } => {
                fs.remove(path)?;
                Ok(RollbackState::None)
            }
        }
    }

    pub fn rollback(&self, fs: &dyn FilesystemPort, state: &RollbackState) -> Result<()> {
        match &self.payload {
            OperationPayload::LinkCreate { source, target } => {
                if fs.is_symlink(target) && fs.read_link(target).ok().as_deref() == Some(source) {
                    fs.remove(target)?;
                }
                Ok(())
            }
            OperationPayload::LinkDelete { target } => {
                if let RollbackState::PriorSymlinkTarget(prior) = state {
                    fs.symlink(prior, target)?;
                }
                Ok(())
            }
            OperationPayload::DirCreate { path } => {
                if fs.exists(path) && fs.read_dir(path).map(|e| e.is_empty()).unwrap_or(false) {
                    fs.remove(path)?;
                }
                Ok(())
            }
            OperationPayload::DirDelete { path } => {
                let mode = match state {
                    RollbackState::PriorPermissions(m) => *m,
                    _ => 0o755,
                };
                fs.mkdir(path, mode)?;
                Ok(())
            }
            OperationPayload::DirCopy { dest, .. } => fs.remove_all(dest),
            OperationPayload::DirRemoveAll { .. } => Ok(()),
            OperationPayload::FileMove { source, dest } => fs.rename(dest, source),
            OperationPayload::FileBackup { backup_dest, .. } => fs.remove(backup_dest),
            OperationPayload::FileDelete { .. } => Ok(()),
        }
    }
}

fn copy_dir_recursive(fs: &dyn FilesystemPort, src: &Path, dst: &Path) -> Result<()> {
    let meta = fs.stat(src)?;
    fs.mkdir_all(dst, meta.permissions)?;
    for entry in fs.read_dir(src)? {
        let from = src.join(&entry.name);
        let to = dst.join(&entry.name);
        let entry_meta = fs.lstat(&from)?;
        if entry_meta.is_symlink() {
            let target = fs.read_link(&from)?;
            fs.symlink(&target, &to)?;
        } else if entry_meta.is_dir() {
            copy_dir_recursive(fs, &from, &to)?;
        } else {
            let bytes = fs.read_file(&from)?;
            fs.write_file(&to, &bytes, entry_meta.permissions)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::InMemoryFilesystem;

    #[test]
    fn validate_rejects_self_linking() {
        let op = Operation::new(
            "op-1",
            OperationPayload::LinkCreate {
                source: PathBuf::from("/a"),
                target: PathBuf::from("/a"),
            },
        );
        assert!(op.validate().is_err());
    }

    #[test]
    fn link_create_then_rollback_removes_link() {
        let fs = InMemoryFilesystem::new();
        let op = Operation::new(
            "op-1",
            OperationPayload::LinkCreate {
                source: PathBuf::from("/pkg/vim/dot-vimrc"),
                target: PathBuf::from("/home/.vimrc"),
            },
        );
        let state = op.execute(&fs).unwrap();
        assert!(fs.is_symlink(Path::new("/home/.vimrc")));
        op.rollback(&fs, &state).unwrap();
        assert!(!fs.exists(Path::new("/home/.vimrc")));
    }

    #[test]
    fn link_delete_rollback_recreates_symlink() {
        let fs = InMemoryFilesystem::new();
        fs.symlink(Path::new("/pkg/vim/dot-vimrc"), Path::new("/home/.vimrc"))
            .unwrap();

        let op = Operation::new(
            "op-1",
            OperationPayload::LinkDelete {
                target: PathBuf::from("/home/.vimrc"),
            },
        );
        let state = op.execute(&fs).unwrap();
        assert!(!fs.exists(Path::new("/home/.vimrc")));

        op.rollback(&fs, &state).unwrap();
        assert_eq!(
            fs.read_link(Path::new("/home/.vimrc")).unwrap(),
            PathBuf::from("/pkg/vim/dot-vimrc")
        );
    }

    #[test]
    fn file_backup_then_rollback_removes_backup() {
        let fs = InMemoryFilesystem::new();
        fs.write_file(Path::new("/home/.vimrc"), b"old", 0o644).unwrap();

        let op = Operation::new(
            "op-1",
            OperationPayload::FileBackup {
                source: PathBuf::from("/home/.vimrc"),
                backup_dest: PathBuf::from("/home/.dot-backup/home__.vimrc.123.bak"),
            },
        );
        let state = op.execute(&fs).unwrap();
        assert_eq!(
            fs.read_file(Path::new("/home/.dot-backup/home__.vimrc.123.bak"))
                .unwrap(),
            b"old"
        );
        op.rollback(&fs, &state).unwrap();
        assert!(!fs.exists(Path::new("/home/.dot-backup/home__.vimrc.123.bak")));
    }

    #[test]
    fn equals_ignores_operation_id() {
        let a = Operation::new(
            "id-a",
            OperationPayload::DirCreate {
                path: PathBuf::from("/x"),
            },
        );
        let b = Operation::new(
            "id-b",
            OperationPayload::DirCreate {
                path: PathBuf::from("/x"),
            },
        );
        assert!(a.equals(&b));
    }
}
