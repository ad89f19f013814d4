// src/error.rs

//! Closed error taxonomy for the dotfiles core.
//!
//! Every fallible operation in the core returns `crate::Result<T>`. Variants
//! mirror the domain errors a caller needs to branch on (conflicts, manifest
//! state, cancellation) rather than wrapping arbitrary causes.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Low-level path construction/traversal failure. Carries a combined
    /// path+reason message; used by the filesystem port and path types.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("path traversal attempt: {0}")]
    PathTraversal(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("package not found: {name}")]
    PackageNotFound { name: String },

    #[error("reserved package name: {name}")]
    ReservedPackageName { name: String },

    #[error("source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("parent directory not found: {path}")]
    ParentNotFound { path: PathBuf },

    #[error("permission denied for {op} on {path}")]
    PermissionDenied { path: PathBuf, op: String },

    #[error("conflict ({kind}) at {path}: {details}")]
    Conflict {
        kind: String,
        path: PathBuf,
        details: String,
        suggestions: Vec<String>,
    },

    #[error("refusing to manage protected path {protected_path} (package {package})")]
    SelfManagement {
        package: String,
        protected_path: PathBuf,
    },

    #[error("plan has no operations")]
    EmptyPlan,

    #[error("execution failed: {executed} executed, {failed} failed, {rolled_back} rolled back")]
    ExecutionFailed {
        executed: usize,
        failed: usize,
        rolled_back: usize,
        errors: Vec<String>,
    },

    #[error("manifest not found")]
    ManifestNotFound,

    #[error("manifest corrupt: {0}")]
    ManifestCorrupt(String),

    #[error("failed to write manifest: {0}")]
    ManifestWriteFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    /// An invariant the Planner is supposed to guarantee was violated
    /// (e.g. a cycle in the operation dependency graph). Always a bug
    /// upstream, never a condition a caller can fix by retrying.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{} errors occurred", .0.len())]
    Multiple(Vec<Error>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::ManifestNotFound)
    }
}
