//! Migration steps and the pipeline that combines them.
//!
//! Each [`Step`] inspects the module through a shared [`Writer`] and
//! proposes a [`ChangeSet`]. [`Steps::changes`] runs the steps in order and
//! merges their proposals into one change set.

mod backend;
mod remote_state;
mod tfvars;
mod workspace;

pub use backend::RemoteBackend;
pub use remote_state::RemoteState;
pub use tfvars::{TFVARS_FILENAME, Tfvars};
pub use workspace::TerraformWorkspace;

use log::{debug, info};

use tfmigrate_hcl::{
    SourceRange,
    error::{Diagnostic, Diagnostics, ErrorCode},
};

use crate::{changes::ChangeSet, writer::Writer};

/// One independent rewrite of a module.
pub trait Step {
    /// Short human readable name.
    fn name(&self) -> &str;

    /// Why the step is needed.
    fn description(&self) -> &str;

    /// Returns `true` if the module needs no changes from this step.
    ///
    /// Used for reporting only; it never modifies documents.
    fn complete(&self, writer: &Writer<'_>) -> bool;

    /// Edit the module's documents and return the files changed.
    fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics);
}

/// Ordered steps sharing one writer.
#[derive(Default)]
pub struct Steps {
    steps: Vec<Box<dyn Step>>,
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step to run after the existing ones.
    pub fn push(&mut self, step: impl Step + 'static) {
        self.steps.push(Box::new(step));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Step> {
        self.steps.iter().map(|step| step.as_ref())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step and merge the results.
    ///
    /// Diagnostics of all steps are collected even when a step reports
    /// errors. When two steps rename the same file the first rename wins and
    /// a warning is added. Files whose contents end up unchanged are left
    /// out of the result.
    pub fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
        let mut changes = ChangeSet::new();
        let mut diagnostics = Diagnostics::new();

        for step in &self.steps {
            let (step_changes, step_diagnostics) = step.changes(writer);
            debug!(
                step = step.name(),
                files = step_changes.len(),
                diagnostics = step_diagnostics.len();
                "Step finished"
            );
            diagnostics.append(step_diagnostics);

            for collision in changes.merge(step_changes) {
                let proposed = writer.dir().join(&collision.proposed);
                diagnostics.emit(
                    Diagnostic::warning("Rename skipped due to conflict")
                        .with_code(ErrorCode::E500)
                        .with_detail(format!(
                            "The \"{}\" step attempted to rename {} to {}, but a previous step already renamed this file to {}.",
                            step.name(),
                            collision.path,
                            collision.proposed,
                            collision.existing
                        ))
                        .with_subject(SourceRange::file(proposed)),
                );
            }
        }

        changes.drop_unchanged(writer.fs());
        info!(files = changes.len(); "Computed changes");
        (changes, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{changes::Change, fs::MemoryFileSystem};

    /// Renames a fixed file, for exercising the merge.
    struct RenameStep {
        name: &'static str,
        file: &'static str,
        rename: &'static str,
    }

    impl Step for RenameStep {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "renames a file"
        }

        fn complete(&self, _: &Writer<'_>) -> bool {
            false
        }

        fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
            let path = writer.module_path(self.file);
            let (doc, diagnostics) = writer.file(&path);
            let mut changes = ChangeSet::new();
            if let Some(doc) = doc {
                changes
                    .add(path, Change::new(doc).with_rename(self.rename))
                    .unwrap();
            }
            (changes, diagnostics)
        }
    }

    #[test]
    fn test_conflicting_renames() {
        let fs = MemoryFileSystem::with_files([
            ("app/main.tf", "locals {}\n"),
            ("app/terraform.tfvars", "a = 1\n"),
        ]);
        let (writer, _) = Writer::new(&fs, Path::new("app"));
        let writer = writer.unwrap();

        let mut steps = Steps::new();
        steps.push(RenameStep {
            name: "First",
            file: "terraform.tfvars",
            rename: "first.auto.tfvars",
        });
        steps.push(RenameStep {
            name: "Second",
            file: "terraform.tfvars",
            rename: "second.auto.tfvars",
        });
        assert_eq!(steps.len(), 2);

        let (changes, diagnostics) = steps.changes(&writer);
        assert_eq!(changes.len(), 1);
        let change = changes.get(Path::new("app/terraform.tfvars")).unwrap();
        assert_eq!(change.rename(), Some("first.auto.tfvars"));

        assert!(!diagnostics.has_errors());
        let warning = diagnostics.iter().next().unwrap();
        assert!(warning.severity().is_warning());
        assert_eq!(warning.summary(), "Rename skipped due to conflict");
        assert_eq!(
            warning.detail(),
            Some(
                "The \"Second\" step attempted to rename app/terraform.tfvars to second.auto.tfvars, but a previous step already renamed this file to first.auto.tfvars."
            )
        );
        assert_eq!(
            warning.subject().unwrap().filename(),
            Path::new("app/second.auto.tfvars")
        );
    }

    #[test]
    fn test_unchanged_files_are_dropped() {
        let fs = MemoryFileSystem::with_files([("app/main.tf", "locals {}\n")]);
        let (writer, _) = Writer::new(&fs, Path::new("app"));
        let writer = writer.unwrap();

        let mut steps = Steps::new();
        steps.push(TerraformWorkspace::new("environment"));
        let (changes, diagnostics) = steps.changes(&writer);

        assert!(changes.is_empty());
        assert!(diagnostics.is_empty());
    }
}
