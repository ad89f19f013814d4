// src/planner/mod.rs

//! The Planner: turns a set of scanned packages into an ordered,
//! conflict-free list of filesystem operations (spec §4.4-§4.6).

pub mod desired_state;
pub mod resolver;
pub mod sort;

pub use desired_state::{Collision, DesiredState, DesiredStateBuilder, LinkTarget};
pub use resolver::{Conflict, ResolveResult, Resolver};
pub use sort::{sort, SortedPlan};
