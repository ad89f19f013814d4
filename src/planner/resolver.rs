// src/planner/resolver.rs

//! Detects conflicts between a `DesiredState` and the current
//! filesystem, and applies per-conflict policy (spec §4.5).

use crate::config::{ConflictPolicy, LinkMode};
use crate::error::Result;
use crate::filesystem::FilesystemPort;
use crate::operations::{Operation, OperationPayload};
use crate::path::relative_from;
use crate::planner::desired_state::DesiredState;
use crate::safety::ProtectedPaths;
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: String,
    pub path: PathBuf,
    pub details: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ResolveResult {
    pub operations: Vec<Operation>,
    pub conflicts: Vec<Conflict>,
    pub warnings: Vec<String>,
}

pub struct Resolver<'a> {
    fs: &'a dyn FilesystemPort,
    backup_dir: &'a Path,
    target_dir: &'a Path,
    policy: ConflictPolicy,
    guard: &'a ProtectedPaths,
    link_mode: LinkMode,
}

impl<'a> Resolver<'a> {
    pub fn new(
        fs: &'a dyn FilesystemPort,
        target_dir: &'a Path,
        backup_dir: &'a Path,
        policy: ConflictPolicy,
        guard: &'a ProtectedPaths,
        link_mode: LinkMode,
    ) -> Self {
        Self {
            fs,
            backup_dir,
            target_dir,
            policy,
            guard,
            link_mode,
        }
    }

    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// The literal value a symlink at `target` should carry, honoring
    /// the configured link mode (spec §9 Open Question iii).
    fn link_value(&self, target: &Path, source: &Path) -> PathBuf {
        match self.link_mode {
            LinkMode::Absolute => source.to_path_buf(),
            LinkMode::Relative => {
                let parent = target.parent().unwrap_or(self.target_dir);
                relative_from(parent, source)
            }
        }
    }

    fn backup_path(&self, target: &Path) -> PathBuf {
        let rel = target.strip_prefix(self.target_dir).unwrap_or(target);
        let flattened = rel.to_string_lossy().replace('/', "__");
        let ts = Utc::now().timestamp_millis();
        self.backup_dir.join(format!("{flattened}.{ts}.bak"))
    }

    pub fn resolve(&self, desired: &DesiredState) -> Result<ResolveResult> {
        let mut result = ResolveResult::default();

        for (target, link) in &desired.links {
            self.guard.guard(&link.package, target)?;

            let link_value = self.link_value(target, &link.source);

            if !self.fs.exists(target) {
                result.operations.push(Operation::new(
                    self.new_id(),
                    OperationPayload::LinkCreate {
                        source: link_value,
                        target: target.clone(),
                    },
                ));
                continue;
            }

            if self.fs.is_symlink(target) {
                let current = self.fs.read_link(target).ok();
                if current.as_deref() == Some(link_value.as_path()) {
                    // Skip: already points at the intended source.
                    continue;
                }
                self.handle_conflict(
                    "WrongLink",
                    target,
                    &format!(
                        "existing symlink points at {:?}, expected {:?}",
                        current, link_value
                    ),
                    link_value,
                    &mut result,
                )?;
            } else if self.fs.is_dir(target) {
                self.handle_conflict(
                    "DirExpected",
                    target,
                    "a directory exists where a link was expected",
                    link_value,
                    &mut result,
                )?;
            } else {
                self.handle_conflict(
                    "FileExists",
                    target,
                    "a regular file exists at the link target",
                    link_value,
                    &mut result,
                )?;
            }
        }

        for dir in &desired.dirs {
            if !self.fs.exists(dir) {
                result
                    .operations
                    .push(Operation::new(self.new_id(), OperationPayload::DirCreate { path: dir.clone() }));
            } else if !self.fs.is_dir(dir) {
                result.conflicts.push(Conflict {
                    kind: "FileExpected".to_string(),
                    path: dir.clone(),
                    details: "a regular file exists where a directory was expected".to_string(),
                    suggestions: vec!["remove the existing file".to_string()],
                });
            }
            // else: already a directory, nothing to do.
        }

        Ok(result)
    }

    fn handle_conflict(
        &self,
        kind: &str,
        target: &Path,
        details: &str,
        source: PathBuf,
        result: &mut ResolveResult,
    ) -> Result<()> {
        match self.policy {
            ConflictPolicy::Fail => {
                result.conflicts.push(Conflict {
                    kind: kind.to_string(),
                    path: target.to_path_buf(),
                    details: details.to_string(),
                    suggestions: vec![
                        "use backup policy".to_string(),
                        "remove the existing file".to_string(),
                    ],
                });
            }
            ConflictPolicy::Skip => {
                result
                    .warnings
                    .push(format!("skipped {} ({})", target.display(), details));
            }
            ConflictPolicy::Backup => {
                let backup_dest = self.backup_path(target);
                let id = self.new_id();
                result.operations.push(Operation::new(
                    id,
                    OperationPayload::FileBackup {
                        source: target.to_path_buf(),
                        backup_dest,
                    },
                ));
                result.operations.push(Operation::new(
                    self.new_id(),
                    OperationPayload::FileDelete {
                        path: target.to_path_buf(),
                    },
                ));
                result.operations.push(Operation::new(
                    self.new_id(),
                    OperationPayload::LinkCreate {
                        source,
                        target: target.to_path_buf(),
                    },
                ));
            }
            ConflictPolicy::Overwrite => {
                result.operations.push(Operation::new(
                    self.new_id(),
                    OperationPayload::FileDelete {
                        path: target.to_path_buf(),
                    },
                ));
                result.operations.push(Operation::new(
                    self.new_id(),
                    OperationPayload::LinkCreate {
                        source,
                        target: target.to_path_buf(),
                    },
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::InMemoryFilesystem;
    use crate::planner::desired_state::LinkTarget;
    use std::collections::{HashMap, HashSet};

    fn single_link_state(target: &str, source: &str) -> DesiredState {
        let mut links = HashMap::new();
        links.insert(
            PathBuf::from(target),
            LinkTarget {
                source: PathBuf::from(source),
                directory: false,
                package: "vim".to_string(),
            },
        );
        DesiredState {
            links,
            dirs: HashSet::new(),
        }
    }

    #[test]
    fn missing_target_emits_link_create() {
        let fs = InMemoryFilesystem::new();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let resolver = Resolver::new(&fs, Path::new("/home/user"), Path::new("/home/user/.dot-backup"), ConflictPolicy::Fail, &guard, LinkMode::Absolute);
        let state = single_link_state("/home/user/.vimrc", "/pkg/vim/dot-vimrc");

        let result = resolver.resolve(&state).unwrap();
        assert_eq!(result.operations.len(), 1);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn existing_file_with_fail_policy_is_a_conflict() {
        let fs = InMemoryFilesystem::new();
        fs.write_file(Path::new("/home/user/.vimrc"), b"old", 0o644).unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let resolver = Resolver::new(&fs, Path::new("/home/user"), Path::new("/home/user/.dot-backup"), ConflictPolicy::Fail, &guard, LinkMode::Absolute);
        let state = single_link_state("/home/user/.vimrc", "/pkg/vim/dot-vimrc");

        let result = resolver.resolve(&state).unwrap();
        assert!(result.operations.is_empty());
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].kind, "FileExists");
    }

    #[test]
    fn existing_file_with_backup_policy_emits_backup_then_delete_then_link() {
        let fs = InMemoryFilesystem::new();
        fs.write_file(Path::new("/home/user/.vimrc"), b"old", 0o644).unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let resolver = Resolver::new(&fs, Path::new("/home/user"), Path::new("/home/user/.dot-backup"), ConflictPolicy::Backup, &guard, LinkMode::Absolute);
        let state = single_link_state("/home/user/.vimrc", "/pkg/vim/dot-vimrc");

        let result = resolver.resolve(&state).unwrap();
        assert_eq!(result.operations.len(), 3);
        assert!(matches!(result.operations[0].payload(), OperationPayload::FileBackup { .. }));
        assert!(matches!(result.operations[1].payload(), OperationPayload::FileDelete { .. }));
        assert!(matches!(result.operations[2].payload(), OperationPayload::LinkCreate { .. }));
    }

    #[test]
    fn link_already_pointing_at_source_is_skipped() {
        let fs = InMemoryFilesystem::new();
        fs.symlink(Path::new("/pkg/vim/dot-vimrc"), Path::new("/home/user/.vimrc"))
            .unwrap();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let resolver = Resolver::new(&fs, Path::new("/home/user"), Path::new("/home/user/.dot-backup"), ConflictPolicy::Fail, &guard, LinkMode::Absolute);
        let state = single_link_state("/home/user/.vimrc", "/pkg/vim/dot-vimrc");

        let result = resolver.resolve(&state).unwrap();
        assert!(result.operations.is_empty());
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn self_management_guard_rejects_protected_path() {
        let fs = InMemoryFilesystem::new();
        let guard = ProtectedPaths::new("/home/user/.config/dotkeep", "/home/user/.local/share/dotkeep");
        let resolver = Resolver::new(&fs, Path::new("/home/user"), Path::new("/home/user/.dot-backup"), ConflictPolicy::Fail, &guard, LinkMode::Absolute);
        let state = single_link_state("/home/user/.config/dotkeep/state.json", "/pkg/evil/x");

        assert!(resolver.resolve(&state).is_err());
    }

    #[test]
    fn relative_link_mode_emits_up_dir_relative_symlink_value() {
        let fs = InMemoryFilesystem::new();
        let guard = ProtectedPaths::new("/nonexistent/config", "/nonexistent/data");
        let resolver = Resolver::new(
            &fs,
            Path::new("/home/user"),
            Path::new("/home/user/.dot-backup"),
            ConflictPolicy::Fail,
            &guard,
            LinkMode::Relative,
        );
        let state = single_link_state("/home/user/.vimrc", "/pkg/vim/dot-vimrc");

        let result = resolver.resolve(&state).unwrap();
        assert_eq!(result.operations.len(), 1);
        match result.operations[0].payload() {
            OperationPayload::LinkCreate { source, .. } => {
                assert_eq!(source, &PathBuf::from("../pkg/vim/dot-vimrc"));
            }
            _ => panic!("expected LinkCreate"),
        }
    }
}
