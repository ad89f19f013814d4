// src/main.rs

use clap::{CommandFactory, Parser};
use dotkeep::cli::{Cli, Commands};
use dotkeep::config::{ConfigBuilder, LinkMode};
use dotkeep::doctor::{self, DoctorContext};
use dotkeep::filesystem::RealFilesystem;
use dotkeep::manifest::Manifest;
use dotkeep::safety::ProtectedPaths;
use dotkeep::services::{AdoptService, ManageService, RemanageService, UnmanageOptions, UnmanageService};
use dotkeep::Dotkeep;
use std::path::PathBuf;
use std::process::ExitCode;

fn resolve_package_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.package_dir {
        return Ok(dir.clone());
    }
    if let Ok(dir) = std::env::var("DOTKEEP_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(std::env::current_dir()?)
}

fn resolve_target_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.target_dir {
        return Ok(dir.clone());
    }
    std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("HOME is not set; pass --target-dir explicitly"))
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_conflicts(conflicts: &[dotkeep::planner::Conflict]) {
    for conflict in conflicts {
        println!(
            "conflict ({}) at {}: {}",
            conflict.kind,
            conflict.path.display(),
            conflict.details
        );
        for suggestion in &conflict.suggestions {
            println!("  hint: {suggestion}");
        }
    }
}

fn print_collisions(collisions: &[dotkeep::planner::Collision]) {
    for collision in collisions {
        println!(
            "collision at {}: claimed by {}",
            collision.target.display(),
            collision.packages.join(", ")
        );
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "dotkeep=debug,info",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let package_dir = resolve_package_dir(&cli)?;
    let target_dir = resolve_target_dir(&cli)?;
    let fs = RealFilesystem::new();
    let guard = ProtectedPaths::discover();

    match &cli.command {
        Commands::Manage {
            packages,
            backup,
            overwrite,
            absolute,
            no_folding,
        } => {
            let config = ConfigBuilder::new(package_dir, target_dir)
                .dry_run(cli.dry_run)
                .backup(*backup)
                .overwrite(*overwrite)
                .link_mode(if *absolute { LinkMode::Absolute } else { LinkMode::Relative })
                .folding(!*no_folding)
                .build()?;
            let report = ManageService::new(&fs, &config, &guard).manage(packages)?;
            print_conflicts(&report.conflicts);
            print_collisions(&report.collisions);
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!(
                "{}: {} executed, {} failed, {} rolled back",
                if report.is_clean() { "ok" } else { "failed" },
                report.result.executed.len(),
                report.result.failed.len(),
                report.result.rolled_back.len(),
            );
            Ok(exit_code(report.is_clean()))
        }
        Commands::Unmanage { packages, purge, cleanup } => {
            let config = ConfigBuilder::new(package_dir, target_dir)
                .dry_run(cli.dry_run)
                .build()?;
            let options = UnmanageOptions { purge: *purge, cleanup: *cleanup };
            let result = UnmanageService::new(&fs, &config).unmanage_with_options(packages, &options)?;
            println!(
                "{}: {} executed, {} failed",
                if result.success() { "ok" } else { "failed" },
                result.executed.len(),
                result.failed.len(),
            );
            Ok(exit_code(result.success()))
        }
        Commands::Remanage { packages } => {
            let config = ConfigBuilder::new(package_dir, target_dir)
                .dry_run(cli.dry_run)
                .build()?;
            let report = RemanageService::new(&fs, &config, &guard).remanage(packages)?;
            println!("unchanged: {}", report.unchanged.join(", "));
            println!("changed: {}", report.changed.join(", "));
            let clean = report.result.as_ref().map(|r| r.is_clean()).unwrap_or(true);
            if let Some(result) = &report.result {
                print_conflicts(&result.conflicts);
            }
            Ok(exit_code(clean))
        }
        Commands::Adopt { package, path } => {
            let config = ConfigBuilder::new(package_dir, target_dir.clone())
                .dry_run(cli.dry_run)
                .build()?;
            let abs_path = if path.is_absolute() {
                path.clone()
            } else {
                target_dir.join(path)
            };
            let report = AdoptService::new(&fs, &config, &guard).adopt(package, &abs_path)?;
            print_conflicts(&report.conflicts);
            println!(
                "{}: adopted {}",
                if report.is_clean() { "ok" } else { "failed" },
                abs_path.display()
            );
            Ok(exit_code(report.is_clean()))
        }
        Commands::Doctor { orphans, fix } => {
            let config = ConfigBuilder::new(package_dir, target_dir).build()?;
            let manifest = Manifest::load_or_default(&config.manifest_dir, chrono::Utc::now())?;
            let ctx = DoctorContext {
                fs: &fs,
                manifest: &manifest,
                target_dir: config.target_dir.as_path(),
                backup_dir: &config.backup_dir,
            };
            let mut checks = doctor::standard_checks();
            if !orphans {
                checks.retain(|c| c.name() != "orphaned-links");
            }
            let report = doctor::diagnose(&ctx, &checks);
            for (name, result) in &report.results {
                let status = result.status.expect("finish() always sets status");
                println!("{name}: {status:?}");
                for issue in &result.issues {
                    println!("  - {}", issue.message);
                }
            }

            if *fix && report.status != doctor::CheckStatus::Pass {
                drop(ctx);
                let dotkeep = Dotkeep::new(&fs, config, guard);
                let outcome = dotkeep.fix(&report)?;
                println!("fix: {} applied, {} failed", outcome.applied.len(), outcome.failed.len());
                for (action, error) in &outcome.failed {
                    println!("  - {action:?}: {error}");
                }
                return Ok(exit_code(outcome.failed.is_empty()));
            }

            Ok(exit_code(report.status == doctor::CheckStatus::Pass))
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
