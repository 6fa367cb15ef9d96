//! Rename `terraform.tfvars` out of the way.

use std::io;

use tfmigrate_hcl::error::Diagnostics;

use crate::{
    changes::{Change, ChangeSet},
    steps::Step,
    writer::Writer,
};

/// The variables file Terraform Cloud writes workspace variables to.
pub const TFVARS_FILENAME: &str = "terraform.tfvars";

/// Renames `terraform.tfvars`, which Terraform Cloud overwrites, to a file
/// that is still loaded automatically.
pub struct Tfvars {
    filename: String,
}

impl Tfvars {
    /// `filename` is the new name, such as `terraform.auto.tfvars`.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Step for Tfvars {
    fn name(&self) -> &str {
        "Rename terraform.tfvars"
    }

    fn description(&self) -> &str {
        "Terraform Cloud passes workspace variables by writing to terraform.tfvars and will overwrite its existing content"
    }

    fn complete(&self, writer: &Writer<'_>) -> bool {
        matches!(
            writer.fs().read(&writer.module_path(TFVARS_FILENAME)),
            Err(err) if err.kind() == io::ErrorKind::NotFound
        )
    }

    fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
        if self.complete(writer) {
            return (ChangeSet::new(), Diagnostics::new());
        }

        let path = writer.module_path(TFVARS_FILENAME);
        let (doc, diagnostics) = writer.file(&path);
        let changes = match doc {
            Some(doc) => ChangeSet::single(path, Change::new(doc).with_rename(&self.filename)),
            None => ChangeSet::new(),
        };
        (changes, diagnostics)
    }
}
