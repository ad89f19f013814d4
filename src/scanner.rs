// src/scanner.rs

//! Walks a package tree, applies ignore rules, and emits a `Package`
//! with dotfile-name translation deferred to desired-state time
//! (spec §4.3).

use crate::error::{Error, Result};
use crate::filesystem::FilesystemPort;
use crate::ignore::IgnoreSet;
use crate::package::{is_reserved_package_name, Node, Package};
use crate::path::PackagePath;
use std::path::{Path, PathBuf};

pub struct Scanner<'a> {
    fs: &'a dyn FilesystemPort,
}

impl<'a> Scanner<'a> {
    pub fn new(fs: &'a dyn FilesystemPort) -> Self {
        Self { fs }
    }

    /// Scan a single package directory into a `Package` tree.
    ///
    /// `name` is validated against the reserved-name list; the walk is
    /// depth-first and lexicographically ordered; `ignore` is evaluated
    /// against each entry's path relative to the package root.
    pub fn scan(&self, name: &str, path: PackagePath, ignore: &IgnoreSet) -> Result<Package> {
        if is_reserved_package_name(name) {
            return Err(Error::ReservedPackageName {
                name: name.to_string(),
            });
        }

        let root_perm = self.fs.stat(path.as_path())?.permissions;
        let children = self.scan_dir(path.as_path(), Path::new(""), ignore)?;
        let tree = Node::Dir {
            path: PathBuf::new(),
            perm: root_perm,
            children,
        };

        Ok(Package::new(name, path, tree))
    }

    fn scan_dir(
        &self,
        abs_dir: &Path,
        rel_dir: &Path,
        ignore: &IgnoreSet,
    ) -> Result<Vec<Node>> {
        let mut entries = self.fs.read_dir(abs_dir)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            let rel_path = rel_dir.join(&entry.name);
            if ignore.matches(&rel_path) {
                continue;
            }
            let abs_path = abs_dir.join(&entry.name);
            let meta = self.fs.stat(&abs_path)?;

            if meta.is_dir() {
                let children = self.scan_dir(&abs_path, &rel_path, ignore)?;
                nodes.push(Node::Dir {
                    path: rel_path,
                    perm: meta.permissions,
                    children,
                });
            } else {
                // Package trees are plain source repositories; a symlink
                // here is scanned as a leaf entry rather than followed.
                nodes.push(Node::File {
                    path: rel_path,
                    perm: meta.permissions,
                });
            }
        }
        Ok(nodes)
    }
}
