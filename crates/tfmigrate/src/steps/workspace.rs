//! Replace `terraform.workspace` with an input variable.

use log::debug;

use tfmigrate_hcl::{Block, TokenKind, Tokens, error::Diagnostics};

use crate::{
    changes::ChangeSet,
    references::{has_reference, rename_reference_prefix},
    steps::Step,
    writer::Writer,
};

const TERRAFORM_WORKSPACE: [&str; 2] = ["terraform", "workspace"];

/// File receiving the new variable declaration.
const VARIABLES_FILENAME: &str = "variables.tf";

/// Rewrites `terraform.workspace` to `var.<name>` and declares the variable.
///
/// With the remote backend every run uses the `default` workspace, so the
/// workspace name has to be passed in as a variable instead.
pub struct TerraformWorkspace {
    variable: String,
}

impl TerraformWorkspace {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }

    /// Name of the variable replacing `terraform.workspace`.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    fn declaration(&self) -> Block {
        let mut block = Block::new("variable", &[self.variable.as_str()]);
        let body = block.body_mut();
        let mut string_type = Tokens::new();
        string_type.push_spaced(TokenKind::Ident, "string");
        body.set_attribute_raw("type", string_type);
        body.set_attribute_raw(
            "description",
            Tokens::quoted(&format!(
                "The {} where the module will be deployed",
                self.variable
            )),
        );
        block
    }
}

impl Step for TerraformWorkspace {
    fn name(&self) -> &str {
        "Terraform Workspace"
    }

    fn description(&self) -> &str {
        "terraform.workspace will always be set to default and should not be used with Terraform Cloud (https://www.terraform.io/docs/state/workspaces.html#current-workspace-interpolation)"
    }

    fn complete(&self, writer: &Writer<'_>) -> bool {
        writer.module().files().iter().all(|path| match writer.file(path) {
            (Some(doc), _) => {
                let doc = doc.borrow();
                !has_reference(doc.body(), &TERRAFORM_WORKSPACE)
            }
            (None, _) => true,
        })
    }

    fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
        let mut changes = ChangeSet::new();
        let mut diagnostics = Diagnostics::new();
        let to = ["var", self.variable.as_str()];

        for path in writer.module().files() {
            let (doc, file_diagnostics) = writer.file(path);
            diagnostics.append(file_diagnostics);
            let Some(doc) = doc else {
                continue;
            };

            let renamed = rename_reference_prefix(
                doc.borrow_mut().body_mut(),
                &TERRAFORM_WORKSPACE,
                &to,
            );
            if renamed > 0 {
                debug!(
                    path = path.display().to_string(),
                    references = renamed;
                    "Replaced terraform.workspace"
                );
                changes.update(path, doc);
            }
        }

        if changes.is_empty() || writer.module().variables().contains_key(&self.variable) {
            return (changes, diagnostics);
        }

        let path = writer.module_path(VARIABLES_FILENAME);
        let (doc, file_diagnostics) = writer.file(&path);
        diagnostics.append(file_diagnostics);
        if let Some(doc) = doc {
            let declared = doc
                .borrow()
                .body()
                .first_matching_block("variable", &[self.variable.as_str()])
                .is_some();
            if !declared {
                doc.borrow_mut().body_mut().prepend_block(self.declaration());
                changes.update(path, doc);
            }
        }

        (changes, diagnostics)
    }
}
