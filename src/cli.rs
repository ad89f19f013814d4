// src/cli.rs
//! CLI definitions for the dotfiles manager.
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations live in `main`.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dotkeep")]
#[command(author = "Dotkeep Project")]
#[command(version)]
#[command(about = "A symlink-based dotfiles manager with atomic plans", long_about = None)]
pub struct Cli {
    /// Directory holding packages (defaults to $DOTKEEP_DIR or the cwd)
    #[arg(short = 'd', long, global = true)]
    pub package_dir: Option<PathBuf>,

    /// Directory symlinks are installed into (defaults to $HOME)
    #[arg(short = 't', long, global = true)]
    pub target_dir: Option<PathBuf>,

    /// Show what would change without touching the filesystem
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (repeatable)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Symlink one or more packages into the target directory
    Manage {
        /// Package names under the package directory
        #[arg(required = true)]
        packages: Vec<String>,

        /// Back up conflicting files before overwriting them
        #[arg(short, long)]
        backup: bool,

        /// Overwrite conflicting files without backing them up
        #[arg(short, long)]
        overwrite: bool,

        /// Use absolute symlinks instead of relative ones
        #[arg(long)]
        absolute: bool,

        /// Disable directory folding
        #[arg(long)]
        no_folding: bool,
    },

    /// Remove the symlinks a package previously installed
    Unmanage {
        /// Package names to unmanage
        #[arg(required = true)]
        packages: Vec<String>,

        /// Also delete the package directory itself after unlinking
        #[arg(long)]
        purge: bool,

        /// Only process packages whose links are already gone from the target
        #[arg(long)]
        cleanup: bool,
    },

    /// Re-derive a package's links after its source tree changed
    Remanage {
        /// Package names to remanage
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Move an existing real file or directory into a package, then link it back
    Adopt {
        /// Package to adopt into
        package: String,

        /// Path under the target directory to adopt
        path: PathBuf,
    },

    /// Check manifest integrity, managed link health, and orphaned links
    Doctor {
        /// Also scan the target directory for orphaned symlinks
        #[arg(long)]
        orphans: bool,

        /// Recreate or remove broken links the checks found
        #[arg(long)]
        fix: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
