//! CLI logic for the tfmigrate tool.
//!
//! Loads the configuration, runs the migration on the module given on the
//! command line and writes the resulting files.

pub mod config;
pub mod error_adapter;

mod args;

pub use args::Args;

use log::{info, warn};

use tfmigrate::{MigrateError, Migration, fs::OsFileSystem};
use tfmigrate_hcl::error::Diagnostics;

use error_adapter::{DiagnosticAdapter, render};

/// Run the tfmigrate CLI application
///
/// Prints every changed file, as `path` or `path -> new path` when the file
/// is renamed, then writes the changes unless `--dry-run` is given.
///
/// # Errors
///
/// Returns `MigrateError` for:
/// - Configuration loading and validation errors
/// - Error diagnostics reported while loading or migrating the module, in
///   which case nothing is written
/// - File I/O errors while writing
pub fn run(args: &Args) -> Result<(), MigrateError> {
    info!(module = args.module.display().to_string(); "Migrating module");

    let config = config::load_config(args.config.as_ref())?
        .merge(args)
        .resolve()?;

    let fs = OsFileSystem;
    let (migration, mut diagnostics) = Migration::new(&fs, &args.module, &config);
    let Some(migration) = migration else {
        return Err(MigrateError::Diagnostics { diagnostics });
    };

    for step in migration.pending_steps() {
        info!(step = step.name(); "{}", step.description());
    }

    let (changes, step_diagnostics) = migration.changes();
    diagnostics.append(step_diagnostics);
    report_warnings(&diagnostics);
    MigrateError::check(&diagnostics)?;

    for (path, change) in &changes {
        let destination = change.destination(path);
        if destination == *path {
            println!("{}", path.display());
        } else {
            println!("{} -> {}", path.display(), destination.display());
        }
    }

    if args.dry_run {
        info!(files = changes.len(); "Dry run, no files written");
        return Ok(());
    }

    migration.write(&changes)?;
    println!("Migration complete!");

    Ok(())
}

fn report_warnings(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity().is_warning())
    {
        warn!("{}", render(&DiagnosticAdapter::new(diagnostic)));
    }
}
