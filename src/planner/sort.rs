// src/planner/sort.rs

//! Orders a set of operations into a dependency-respecting sequence and
//! groups independent operations into parallel batches (spec §4.6).

use crate::error::{Error, Result};
use crate::operations::{Operation, OperationKind};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A plan ready for execution: operations in a valid order, plus a
/// partition of that same order into batches the Executor may run
/// concurrently (every operation in a batch is independent of every
/// other operation in that batch).
#[derive(Debug, Default)]
pub struct SortedPlan {
    pub operations: Vec<Operation>,
    pub batches: Vec<Vec<usize>>,
}

/// Returns true when `a` must run before `b`.
fn must_precede(a: &Operation, b: &Operation) -> bool {
    use OperationKind::*;

    // A DirCreate must happen before anything that touches a path under it.
    if a.kind() == DirCreate {
        if let Some(dir) = a.produces() {
            if b.touched_paths().iter().any(|p| p.starts_with(dir) && *p != dir) {
                return true;
            }
        }
    }

    // Anything that frees up a target path (delete/backup) must precede a
    // LinkCreate that lands on that same path.
    if matches!(a.kind(), FileDelete | FileBackup) {
        if let Some(freed) = a.touched_paths().into_iter().next() {
            if b.kind() == LinkCreate && b.touched_paths().contains(&freed) {
                return true;
            }
        }
    }
    if a.kind() == LinkDelete {
        if let Some(target) = a.touched_paths().into_iter().next() {
            if b.kind() == DirDelete && b.touched_paths().into_iter().any(|p| p == target || target.starts_with(p)) {
                return true;
            }
        }
    }

    // A FileMove must precede anything that depends on its destination.
    if a.kind() == FileMove {
        if let Some(dest) = a.produces() {
            if b.touched_paths().iter().any(|p| *p == dest) {
                return true;
            }
        }
    }

    // A LinkDelete/FileDelete on a path must precede a DirDelete of its
    // parent directory.
    if matches!(a.kind(), LinkDelete | FileDelete) {
        if let Some(path) = a.touched_paths().into_iter().next() {
            if b.kind() == DirDelete {
                if let Some(dir) = b.produces().or_else(|| b.touched_paths().into_iter().next()) {
                    if path.starts_with(dir) && path != dir {
                        return true;
                    }
                }
            }
        }
    }

    false
}

/// Build a dependency graph over `operations` and emit a topological
/// order plus parallel batches. Returns `Error::Internal` if the graph
/// contains a cycle (which would indicate a Planner bug upstream).
pub fn sort(operations: Vec<Operation>) -> Result<SortedPlan> {
    let n = operations.len();
    if n == 0 {
        return Ok(SortedPlan::default());
    }

    let mut edges: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    let mut indegree = vec![0usize; n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if must_precede(&operations[i], &operations[j]) && edges[i].insert(j) {
                indegree[j] += 1;
            }
        }
    }

    let mut batches: Vec<Vec<usize>> = Vec::new();
    let mut remaining: HashSet<usize> = (0..n).collect();
    let mut order: Vec<usize> = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|i| indegree[*i] == 0)
            .collect();

        if ready.is_empty() {
            return Err(Error::Internal("cycle detected while sorting operations".into()));
        }

        let batch = partition_by_path_overlap(&ready, &operations);
        for group in &batch {
            for &i in group {
                order.push(i);
                remaining.remove(&i);
                for &next in &edges[i] {
                    indegree[next] -= 1;
                }
            }
        }
        batches.extend(batch);
    }

    let index_map: HashMap<usize, usize> = order.iter().enumerate().map(|(pos, &i)| (i, pos)).collect();
    let sorted_ops: Vec<Operation> = order.iter().map(|&i| operations[i].clone()).collect();
    let remapped_batches: Vec<Vec<usize>> = batches
        .into_iter()
        .map(|group| group.into_iter().map(|i| index_map[&i]).collect())
        .collect();

    Ok(SortedPlan {
        operations: sorted_ops,
        batches: remapped_batches,
    })
}

/// Among operations with no remaining dependency, further split into
/// sub-groups so that no two operations in the same group touch
/// overlapping paths (one being an ancestor of the other, or equal).
fn partition_by_path_overlap(ready: &[usize], operations: &[Operation]) -> Vec<Vec<usize>> {
    let mut groups: Vec<(Vec<usize>, Vec<PathBuf>)> = Vec::new();

    'outer: for &i in ready {
        let paths: Vec<PathBuf> = operations[i].touched_paths().into_iter().map(|p| p.to_path_buf()).collect();
        for (members, claimed) in groups.iter_mut() {
            if !overlaps(&paths, claimed) {
                members.push(i);
                claimed.extend(paths);
                continue 'outer;
            }
        }
        groups.push((vec![i], paths));
    }

    groups.into_iter().map(|(members, _)| members).collect()
}

fn overlaps(a: &[PathBuf], b: &[PathBuf]) -> bool {
    a.iter().any(|p| b.iter().any(|q| path_conflicts(p, q)))
}

fn path_conflicts(a: &Path, b: &Path) -> bool {
    a == b || a.starts_with(b) || b.starts_with(a)
}
