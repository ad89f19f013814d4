// src/executor.rs

//! Executes a sorted plan with two-phase commit and rollback on
//! failure (spec §4.9).

use crate::error::{Error, Result};
use crate::filesystem::FilesystemPort;
use crate::operations::{Operation, OperationPayload, RollbackState};
use crate::planner::SortedPlan;
use crate::progress::ProgressTracker;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

/// Execution strategy for a plan's batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

/// Outcome of running a plan to completion (successfully or not).
#[derive(Debug, Default)]
pub struct ExecutionResult {
    pub executed: Vec<String>,
    pub failed: Vec<String>,
    pub rolled_back: Vec<String>,
    pub errors: Vec<String>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn partial_failure(&self) -> bool {
        !self.failed.is_empty() && !self.executed.is_empty()
    }
}

/// Signal used to cooperatively cancel a running plan (spec §5). Checked
/// between operations and between batches; never interrupts a single
/// operation mid-flight.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(std::sync::Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(std::sync::Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a `SortedPlan` against a `FilesystemPort`, validating every
/// operation up front (Prepare), then committing batch by batch, and
/// rolling back everything already committed if any operation fails.
pub struct Executor<'a> {
    fs: &'a dyn FilesystemPort,
    mode: ExecutionMode,
    progress: Option<&'a dyn ProgressTracker>,
    cancellation: CancellationToken,
}

impl<'a> Executor<'a> {
    pub fn new(fs: &'a dyn FilesystemPort, mode: ExecutionMode) -> Self {
        Self {
            fs,
            mode,
            progress: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Prepare: structural validation of every operation, then a
    /// virtual-filesystem precondition pass that walks the plan in its
    /// sorted order, tracking the paths earlier operations in the same
    /// plan would create or remove, so an operation that depends on one
    /// of those (rather than on something already on disk) isn't
    /// rejected for a path that will exist by the time its turn comes.
    /// No real filesystem mutation happens here.
    fn prepare(&self, plan: &SortedPlan) -> Result<()> {
        for op in &plan.operations {
            op.validate()?;
        }
        self.check_preconditions(plan)
    }

    fn check_preconditions(&self, plan: &SortedPlan) -> Result<()> {
        let mut created: HashSet<&Path> = HashSet::new();
        let mut removed: HashSet<&Path> = HashSet::new();

        let exists = |created: &HashSet<&Path>, removed: &HashSet<&Path>, path: &Path| {
            if removed.contains(path) {
                false
            } else if created.contains(path) {
                true
            } else {
                self.fs.exists(path)
            }
        };

        for op in &plan.operations {
            let required: Option<&Path> = match op.payload() {
                OperationPayload::LinkDelete { target } => Some(target),
                OperationPayload::DirDelete { path } => Some(path),
                OperationPayload::DirCopy { source, .. } => Some(source),
                OperationPayload::FileMove { source, .. } => Some(source),
                OperationPayload::FileBackup { source, .. } => Some(source),
                OperationPayload::FileDelete { path } => Some(path),
                OperationPayload::LinkCreate { .. }
                | OperationPayload::DirCreate { .. }
                | OperationPayload::DirRemoveAll { .. } => None,
            };

            if let Some(path) = required
                && !exists(&created, &removed, path)
            {
                return Err(Error::SourceNotFound { path: path.to_path_buf() });
            }

            match op.payload() {
                OperationPayload::LinkDelete { target } => {
                    removed.insert(target);
                }
                OperationPayload::DirDelete { path } | OperationPayload::FileDelete { path } => {
                    removed.insert(path);
                }
                OperationPayload::DirRemoveAll { path } => {
                    removed.insert(path);
                }
                OperationPayload::FileMove { source, .. } => {
                    removed.insert(source);
                }
                _ => {}
            }
            if let Some(produced) = op.produces() {
                created.insert(produced);
                removed.remove(produced);
            }
        }
        Ok(())
    }

    pub fn commit(&self, plan: SortedPlan) -> Result<ExecutionResult> {
        self.prepare(&plan)?;
        if let Some(p) = self.progress {
            p.set_length(plan.operations.len() as u64);
        }

        if plan.operations.is_empty() {
            return Err(Error::EmptyPlan);
        }

        let committed: Mutex<Vec<(Operation, RollbackState)>> = Mutex::new(Vec::new());
        let mut result = ExecutionResult::default();

        for batch in &plan.batches {
            if self.cancellation.is_cancelled() {
                break;
            }

            let ops: Vec<&Operation> = batch.iter().map(|&i| &plan.operations[i]).collect();
            let outcomes: Vec<(usize, Result<RollbackState>)> = match self.mode {
                ExecutionMode::Sequential => ops
                    .iter()
                    .enumerate()
                    .map(|(idx, op)| (idx, op.execute(self.fs)))
                    .collect(),
                ExecutionMode::Parallel => ops
                    .par_iter()
                    .enumerate()
                    .map(|(idx, op)| (idx, op.execute(self.fs)))
                    .collect(),
            };

            let mut batch_failed = false;
            for (idx, outcome) in outcomes {
                let op = ops[idx];
                match outcome {
                    Ok(state) => {
                        info!(operation = %op.describe(), "executed");
                        result.executed.push(op.id().to_string());
                        committed.lock().unwrap().push((op.clone(), state));
                        if let Some(p) = self.progress {
                            p.increment(1);
                        }
                    }
                    Err(e) => {
                        warn!(operation = %op.describe(), error = %e, "execution failed");
                        result.failed.push(op.id().to_string());
                        result.errors.push(e.to_string());
                        batch_failed = true;
                    }
                }
            }

            if batch_failed {
                self.rollback(&committed.into_inner().unwrap(), &mut result);
                return Ok(result);
            }
        }

        if self.cancellation.is_cancelled() {
            self.rollback(&committed.into_inner().unwrap(), &mut result);
            result.errors.push("execution cancelled".to_string());
            return Ok(result);
        }

        if let Some(p) = self.progress {
            p.finish_with_message("plan committed");
        }
        Ok(result)
    }

    fn rollback(&self, committed: &[(Operation, RollbackState)], result: &mut ExecutionResult) {
        for (op, state) in committed.iter().rev() {
            match op.rollback(self.fs, state) {
                Ok(()) => {
                    result.rolled_back.push(op.id().to_string());
                }
                Err(e) => {
                    warn!(operation = %op.describe(), error = %e, "rollback failed");
                    result.errors.push(format!("rollback of {} failed: {e}", op.id()));
                }
            }
        }
    }
}
