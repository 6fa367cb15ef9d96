//! Migration settings.
//!
//! [`MigrationConfig`] implements [`serde::Deserialize`] so front ends can
//! load it from a file; every setting except the backend has a default.
//!
//! # Example
//!
//! ```
//! # use tfmigrate::config::MigrationConfig;
//! # use tfmigrate_core::backend::{RemoteBackendConfig, WorkspaceConfig};
//! let backend = RemoteBackendConfig::new(
//!     "app.terraform.io",
//!     "acme",
//!     WorkspaceConfig::Name("networking".to_string()),
//! );
//! let config = MigrationConfig::new(backend).with_modules_dir("../modules");
//!
//! assert_eq!(config.workspace_variable(), "environment");
//! assert_eq!(config.tfvars_filename(), "terraform.auto.tfvars");
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use tfmigrate_core::backend::RemoteBackendConfig;

/// Variable that replaces `terraform.workspace` unless configured otherwise.
pub const DEFAULT_WORKSPACE_VARIABLE: &str = "environment";

/// Name `terraform.tfvars` is renamed to unless configured otherwise.
pub const DEFAULT_TFVARS_FILENAME: &str = "terraform.auto.tfvars";

fn default_workspace_variable() -> String {
    DEFAULT_WORKSPACE_VARIABLE.to_string()
}

fn default_tfvars_filename() -> String {
    DEFAULT_TFVARS_FILENAME.to_string()
}

/// Settings for one migration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MigrationConfig {
    /// The remote backend the module moves to.
    backend: RemoteBackendConfig,

    #[serde(default = "default_workspace_variable")]
    workspace_variable: String,

    #[serde(default = "default_tfvars_filename")]
    tfvars_filename: String,

    /// Directory of other modules whose remote state data sources should
    /// follow the migration.
    #[serde(default)]
    modules_dir: Option<PathBuf>,
}

impl MigrationConfig {
    /// Creates a config with default settings for everything but the backend.
    pub fn new(backend: RemoteBackendConfig) -> Self {
        Self {
            backend,
            workspace_variable: default_workspace_variable(),
            tfvars_filename: default_tfvars_filename(),
            modules_dir: None,
        }
    }

    pub fn with_workspace_variable(mut self, name: impl Into<String>) -> Self {
        self.workspace_variable = name.into();
        self
    }

    pub fn with_tfvars_filename(mut self, filename: impl Into<String>) -> Self {
        self.tfvars_filename = filename.into();
        self
    }

    pub fn with_modules_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.modules_dir = Some(dir.into());
        self
    }

    pub fn backend(&self) -> &RemoteBackendConfig {
        &self.backend
    }

    /// Name of the variable replacing `terraform.workspace`.
    pub fn workspace_variable(&self) -> &str {
        &self.workspace_variable
    }

    /// New name of `terraform.tfvars`.
    pub fn tfvars_filename(&self) -> &str {
        &self.tfvars_filename
    }

    pub fn modules_dir(&self) -> Option<&Path> {
        self.modules_dir.as_deref()
    }
}
