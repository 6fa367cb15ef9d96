//! Replace the module's backend with the remote backend.

use std::path::PathBuf;

use log::debug;

use tfmigrate_core::{
    backend::{BACKEND_TYPE_REMOTE, RemoteBackendConfig},
    value::Value,
};
use tfmigrate_hcl::{Block, Body, error::Diagnostics};

use crate::{
    changes::{Change, ChangeSet},
    steps::Step,
    writer::Writer,
};

/// File receiving the backend when the module has none.
const BACKEND_FILENAME: &str = "backend.tf";

/// Configures a `remote` backend.
///
/// The existing backend block is replaced in place. A module without a
/// backend gets a `terraform` block in `backend.tf`.
pub struct RemoteBackend {
    config: RemoteBackendConfig,
}

impl RemoteBackend {
    pub fn new(config: RemoteBackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RemoteBackendConfig {
        &self.config
    }

    /// `backend "remote" { ... }` for the configured settings.
    fn remote_block(&self) -> Block {
        let mut backend = Block::new("backend", &[BACKEND_TYPE_REMOTE]);
        let body = backend.body_mut();
        body.set_attribute_value("hostname", &Value::string(self.config.hostname()));
        body.set_attribute_value("organization", &Value::string(self.config.organization()));
        body.append_newline();

        let workspaces = self.config.workspaces();
        body.append_block(Block::new("workspaces", &[]))
            .body_mut()
            .set_attribute_value(workspaces.attribute_name(), &Value::string(workspaces.value()));
        backend
    }

    /// Swap every backend inside `terraform` blocks for the remote backend.
    fn replace_backends(&self, body: &mut Body) {
        for terraform in body.blocks_mut().filter(|block| block.kind() == "terraform") {
            let terraform = terraform.body_mut();
            let existing: Vec<Vec<String>> = terraform
                .blocks()
                .filter(|block| block.kind() == "backend")
                .map(|block| block.labels())
                .collect();
            if existing.is_empty() {
                continue;
            }
            for labels in &existing {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                terraform.remove_block("backend", &labels);
            }
            terraform.append_block(self.remote_block());
        }
    }
}

impl Step for RemoteBackend {
    fn name(&self) -> &str {
        "Remote Backend"
    }

    fn description(&self) -> &str {
        "A \"remote\" backend should be configured for Terraform Cloud (https://www.terraform.io/docs/backends/types/remote.html)"
    }

    fn complete(&self, writer: &Writer<'_>) -> bool {
        writer
            .module()
            .backend()
            .is_some_and(|backend| backend.kind() == BACKEND_TYPE_REMOTE)
    }

    fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
        let backend = writer.module().backend();
        let path: PathBuf = match backend {
            Some(backend) => backend.filename().to_path_buf(),
            None => writer.module_path(BACKEND_FILENAME),
        };

        let (doc, diagnostics) = writer.file(&path);
        let Some(doc) = doc else {
            return (ChangeSet::new(), diagnostics);
        };

        {
            let mut doc = doc.borrow_mut();
            if backend.is_none() {
                debug!(path = path.display().to_string(); "Adding terraform block");
                let mut terraform = Block::new("terraform", &[]);
                terraform.body_mut().append_block(self.remote_block());
                doc.body_mut().append_block(terraform);
            } else {
                self.replace_backends(doc.body_mut());
            }
        }

        (ChangeSet::single(path, Change::new(doc)), diagnostics)
    }
}
