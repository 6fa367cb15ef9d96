//! tfmigrate - Migrate Terraform modules to a remote backend.
//!
//! A [`Migration`] loads a module directory, runs an ordered list of
//! [`steps`] against its configuration files and collects the edits into a
//! [`ChangeSet`]. Files are only written when the caller asks for it, so the
//! same migration can be previewed first.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use tfmigrate::{
//!     Migration, MigrationConfig,
//!     fs::MemoryFileSystem,
//! };
//! use tfmigrate_core::backend::{RemoteBackendConfig, WorkspaceConfig};
//!
//! let fs = MemoryFileSystem::with_files([(
//!     "app/main.tf",
//!     "output \"env\" {\n  value = terraform.workspace\n}\n",
//! )]);
//! let config = MigrationConfig::new(RemoteBackendConfig::new(
//!     "app.terraform.io",
//!     "acme",
//!     WorkspaceConfig::Name("app".to_string()),
//! ));
//!
//! let (migration, diagnostics) = Migration::new(&fs, Path::new("app"), &config);
//! assert!(!diagnostics.has_errors());
//! let migration = migration.unwrap();
//!
//! let (changes, _) = migration.changes();
//! let paths: Vec<_> = changes.paths().collect();
//! assert_eq!(
//!     paths,
//!     [
//!         Path::new("app/backend.tf"),
//!         Path::new("app/main.tf"),
//!         Path::new("app/variables.tf"),
//!     ]
//! );
//!
//! migration.write(&changes).unwrap();
//! assert!(fs.contents("app/main.tf").unwrap().contains("var.environment"));
//! ```

pub mod changes;
pub mod config;
pub mod correlate;
pub mod fs;
pub mod module;
pub mod references;
pub mod steps;
pub mod store;
pub mod writer;

mod error;

pub use changes::{Change, ChangeSet};
pub use config::MigrationConfig;
pub use error::MigrateError;
pub use writer::Writer;

use std::path::Path;

use log::{debug, info};

use tfmigrate_hcl::error::Diagnostics;

use fs::FileSystem;
use steps::{RemoteBackend, RemoteState, Step, Steps, TerraformWorkspace, Tfvars};

/// A module directory and the steps migrating it.
pub struct Migration<'fs> {
    writer: Writer<'fs>,
    steps: Steps,
    load_diagnostics: Diagnostics,
}

impl<'fs> Migration<'fs> {
    /// Load the module in `dir` and set up the steps for `config`.
    ///
    /// Returns `None` if `dir` is not a module directory. Diagnostics from
    /// loading the module are returned either way.
    pub fn new(
        fs: &'fs dyn FileSystem,
        dir: &Path,
        config: &MigrationConfig,
    ) -> (Option<Self>, Diagnostics) {
        let (writer, diagnostics) = Writer::new(fs, dir);
        let migration = writer.map(|writer| Self {
            writer,
            steps: Self::default_steps(config),
            load_diagnostics: diagnostics.clone(),
        });
        (migration, diagnostics)
    }

    fn default_steps(config: &MigrationConfig) -> Steps {
        let mut steps = Steps::new();
        steps.push(RemoteBackend::new(config.backend().clone()));
        steps.push(TerraformWorkspace::new(config.workspace_variable()));
        steps.push(Tfvars::new(config.tfvars_filename()));
        if let Some(modules_dir) = config.modules_dir() {
            steps.push(RemoteState::new(config.backend().clone(), modules_dir));
        }
        steps
    }

    pub fn writer(&self) -> &Writer<'fs> {
        &self.writer
    }

    pub fn steps(&self) -> &Steps {
        &self.steps
    }

    /// The steps that still have work to do.
    pub fn pending_steps(&self) -> impl Iterator<Item = &dyn Step> {
        self.steps.iter().filter(|step| !step.complete(&self.writer))
    }

    /// Run every step and collect the resulting edits.
    ///
    /// Documents are edited in memory; nothing is written.
    pub fn changes(&self) -> (ChangeSet, Diagnostics) {
        info!(dir = self.writer.dir().display().to_string(); "Computing changes");
        self.steps.changes(&self.writer)
    }

    /// Write `changes` to the file system.
    pub fn write(&self, changes: &ChangeSet) -> Result<(), MigrateError> {
        debug!(files = changes.len(); "Writing changes");
        changes.write_files(self.writer.fs())?;
        Ok(())
    }

    /// Compute the changes and write them unless an error was reported.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Diagnostics`] without writing anything if
    /// loading the module or any step reported an error, or
    /// [`MigrateError::Io`] if writing failed.
    pub fn apply(&self) -> Result<(ChangeSet, Diagnostics), MigrateError> {
        let (changes, diagnostics) = self.changes();
        let mut reported = self.load_diagnostics.clone();
        reported.append(diagnostics.clone());
        MigrateError::check(&reported)?;
        self.write(&changes)?;
        Ok((changes, diagnostics))
    }
}
