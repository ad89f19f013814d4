// src/lib.rs

//! Dotkeep
//!
//! A symlink-based dotfiles manager with atomic plans and rollback.
//!
//! # Architecture
//!
//! - Filesystem Port: every filesystem touch goes through `FilesystemPort`,
//!   so the same logic runs against `RealFilesystem` in production and
//!   `InMemoryFilesystem` in tests.
//! - Scanner -> Planner -> Executor: packages are scanned into a tree,
//!   folded and resolved into a `DesiredState`, sorted into a dependency-
//!   ordered `SortedPlan`, then committed with two-phase commit and
//!   rollback on failure.
//! - Manifest: the only persisted state: which packages are managed,
//!   what they link, and a content hash used to detect drift.
//! - Services: `Manage`, `Unmanage`, `Remanage`, `Adopt` orchestrate the
//!   pipeline above into the four verbs the CLI exposes; `Doctor` runs
//!   independent read-only diagnostics over the same state.

pub mod cli;
pub mod config;
pub mod content_hash;
pub mod doctor;
pub mod dotfile;
mod error;
pub mod executor;
pub mod facade;
pub mod filesystem;
pub mod hash;
pub mod ignore;
pub mod manifest;
pub mod operations;
pub mod package;
pub mod path;
pub mod planner;
pub mod progress;
pub mod safety;
pub mod scanner;
pub mod services;

pub use config::{Config, ConfigBuilder, ConflictPolicy, LinkMode};
pub use error::{Error, Result};
pub use executor::{CancellationToken, ExecutionMode, ExecutionResult, Executor};
pub use facade::Dotkeep;
pub use hash::{Hash, HashAlgorithm};
pub use ignore::IgnoreSet;
pub use manifest::{Manifest, PackageInfo, PackageSource, MANIFEST_FILE_NAME};
pub use package::{Node, Package, RESERVED_PACKAGE_NAMES};
pub use path::{FilePath, PackagePath, TargetPath};
pub use planner::{Collision, Conflict, DesiredState, DesiredStateBuilder, ResolveResult, Resolver};
pub use progress::{
    CallbackProgress, LogProgress, ProgressEvent, ProgressStyle, ProgressTracker, SilentProgress,
};
pub use safety::{Confidence, ProtectedPaths, TriageCategory};
pub use scanner::Scanner;
pub use services::{
    AdoptService, ManageReport, ManageService, RemanageReport, RemanageService, UnmanageOptions, UnmanageService,
};
