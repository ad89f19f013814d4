// src/services/mod.rs

//! The four verb-level services that sit above the Planner/Executor/
//! Doctor core: Manage, Unmanage, Remanage, and Adopt (spec §4.12).

pub mod adopt;
pub mod manage;
pub mod remanage;
pub mod unmanage;

pub use adopt::AdoptService;
pub use manage::{ManageReport, ManageService};
pub use remanage::{RemanageReport, RemanageService};
pub use unmanage::{UnmanageOptions, UnmanageService};

use crate::ignore::IgnoreSet;
use crate::manifest::Manifest;

/// The ignore set a service run should apply: built-in defaults plus
/// whatever patterns the manifest has accumulated across prior runs
/// (spec §4.2).
pub(crate) fn build_ignore_set(manifest: &Manifest) -> IgnoreSet {
    let mut set = IgnoreSet::with_defaults();
    let _ = set.add_patterns(manifest.ignored.patterns.iter());
    set
}
