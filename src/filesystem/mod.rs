// src/filesystem/mod.rs

//! The Filesystem Port and its two implementations.
//!
//! Everything above this module (Scanner, Planner, Executor, Doctor)
//! talks to the filesystem only through `FilesystemPort`, so the same
//! logic runs against `RealFilesystem` in production and
//! `InMemoryFilesystem` in tests.

pub mod memory;
pub mod port;
pub mod real;
pub mod vfs;

pub use memory::InMemoryFilesystem;
pub use port::{DirEntry, EntryKind, FilesystemPort, Metadata};
pub use real::RealFilesystem;
pub use vfs::{NodeId, NodeKind, VfsNode, VfsTree};
