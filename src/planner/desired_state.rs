// src/planner/desired_state.rs

//! Computes the target-side layout a set of packages implies, with
//! directory folding (spec §4.4).

use crate::dotfile;
use crate::filesystem::FilesystemPort;
use crate::package::{Node, Package};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A single desired link: `target <- source`. `directory` is true when
/// this link was produced by folding (the whole target directory is a
/// symlink to a package subtree) rather than one file at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub source: PathBuf,
    pub directory: bool,
    pub package: String,
}

#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub links: HashMap<PathBuf, LinkTarget>,
    pub dirs: HashSet<PathBuf>,
}

/// Target paths two or more packages both tried to claim; these never
/// make it into `DesiredState::links`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub target: PathBuf,
    pub packages: Vec<String>,
}

pub struct DesiredStateBuilder<'a> {
    fs: &'a dyn FilesystemPort,
    target_dir: &'a Path,
    package_name_mapping: bool,
    folding: bool,
}

impl<'a> DesiredStateBuilder<'a> {
    pub fn new(
        fs: &'a dyn FilesystemPort,
        target_dir: &'a Path,
        package_name_mapping: bool,
        folding: bool,
    ) -> Self {
        Self {
            fs,
            target_dir,
            package_name_mapping,
            folding,
        }
    }

    /// The target-side root a package's files are placed under.
    fn package_root(&self, package: &Package) -> PathBuf {
        if self.package_name_mapping {
            let translated = dotfile::to_target(Path::new(&package.name));
            self.target_dir.join(translated)
        } else {
            self.target_dir.to_path_buf()
        }
    }

    pub fn build(&self, packages: &[Package]) -> (DesiredState, Vec<Collision>) {
        let mut raw_links: HashMap<PathBuf, Vec<(String, PathBuf)>> = HashMap::new();
        let mut dirs: HashSet<PathBuf> = HashSet::new();

        for package in packages {
            let root = self.package_root(package);
            for (rel_path, _perm) in package.files() {
                let target_rel = dotfile::to_target(rel_path);
                let target = root.join(&target_rel);
                let source = package.path.as_path().join(rel_path);

                raw_links
                    .entry(target.clone())
                    .or_default()
                    .push((package.name.clone(), source));

                let mut ancestor = target.parent().map(|p| p.to_path_buf());
                while let Some(dir) = ancestor {
                    if dir == *self.target_dir || !dirs.insert(dir.clone()) {
                        break;
                    }
                    ancestor = dir.parent().map(|p| p.to_path_buf());
                }
            }
        }

        let mut links = HashMap::new();
        let mut collisions = Vec::new();
        for (target, mut contributors) in raw_links {
            if contributors.len() > 1 {
                collisions.push(Collision {
                    target,
                    packages: contributors.into_iter().map(|(name, _)| name).collect(),
                });
                continue;
            }
            let (package, source) = contributors.remove(0);
            links.insert(
                target,
                LinkTarget {
                    source,
                    directory: false,
                    package,
                },
            );
        }

        let mut state = DesiredState { links, dirs };

        if self.folding {
            for package in packages {
                self.fold_package(package, &mut state, &collisions);
            }
        }

        (state, collisions)
    }

    fn fold_package(&self, package: &Package, state: &mut DesiredState, collisions: &[Collision]) {
        let root_target = self.package_root(package);
        self.try_fold_node(&package.tree, &root_target, package, state, collisions);
    }

    /// Attempt to fold `node` (rooted at `target_dir`) into one
    /// directory-link. Returns true if folding happened at this level
    /// (so the caller must not also recurse into children).
    fn try_fold_node(
        &self,
        node: &Node,
        target_dir: &Path,
        package: &Package,
        state: &mut DesiredState,
        collisions: &[Collision],
    ) -> bool {
        let Node::Dir { children, .. } = node else {
            return false;
        };
        if children.is_empty() {
            return false;
        }

        let source_dir = package.path.as_path().join(node.path());
        let real_dir_with_other_contents = self.fs.is_dir(target_dir)
            && self
                .fs
                .read_dir(target_dir)
                .map(|entries| !entries.is_empty())
                .unwrap_or(false);

        let any_collision_under = collisions
            .iter()
            .any(|c| c.target == target_dir || c.target.starts_with(target_dir));

        if !real_dir_with_other_contents && !any_collision_under {
            // Fold: replace every descendant link under target_dir with
            // one directory-link, and drop intermediate dir-creates.
            self.remove_subtree_links(target_dir, state);
            state.dirs.retain(|d| !d.starts_with(target_dir));
            state.links.insert(
                target_dir.to_path_buf(),
                LinkTarget {
                    source: source_dir,
                    directory: true,
                    package: package.name.clone(),
                },
            );
            return true;
        }

        for child in children {
            let child_target = target_dir.join(child.path().file_name().unwrap_or_default());
            if child.is_dir() {
                self.try_fold_node(child, &child_target, package, state, collisions);
            }
        }
        false
    }

    fn remove_subtree_links(&self, target_dir: &Path, state: &mut DesiredState) {
        state
            .links
            .retain(|target, _| !target.starts_with(target_dir));
    }
}
