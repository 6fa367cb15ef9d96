//! Settings of the remote backend a module is migrated to.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from a
//! configuration file as well as built from command-line flags.
//!
//! # Example
//!
//! ```
//! # use tfmigrate_core::backend::{RemoteBackendConfig, WorkspaceConfig};
//! let config = RemoteBackendConfig::new(
//!     "app.terraform.io",
//!     "acme",
//!     WorkspaceConfig::Prefix("networking-".to_string()),
//! );
//! assert!(config.multiple_workspaces());
//! ```

use serde::Deserialize;

/// Backend type written by the migration.
pub const BACKEND_TYPE_REMOTE: &str = "remote";

/// Hostname used when none is configured.
pub const DEFAULT_HOSTNAME: &str = "app.terraform.io";

fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_string()
}

/// Target remote backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteBackendConfig {
    #[serde(default = "default_hostname")]
    hostname: String,

    organization: String,

    workspaces: WorkspaceConfig,
}

impl RemoteBackendConfig {
    /// Creates a new [`RemoteBackendConfig`].
    ///
    /// # Arguments
    ///
    /// * `hostname` - Hostname of the remote service.
    /// * `organization` - Organization owning the workspaces.
    /// * `workspaces` - Either a single workspace name or a workspace prefix.
    pub fn new(
        hostname: impl Into<String>,
        organization: impl Into<String>,
        workspaces: WorkspaceConfig,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            organization: organization.into(),
            workspaces,
        }
    }

    /// Returns the hostname.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the organization.
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Returns the workspace selection.
    pub fn workspaces(&self) -> &WorkspaceConfig {
        &self.workspaces
    }

    /// Returns whether the backend is configured for multiple prefixed workspaces.
    pub fn multiple_workspaces(&self) -> bool {
        matches!(self.workspaces, WorkspaceConfig::Prefix(_))
    }
}

/// Selects the workspaces a module maps to.
///
/// Deserializes from a table with exactly one of `name` or `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceConfig {
    /// A single workspace.
    Name(String),
    /// All workspaces whose name starts with the prefix.
    Prefix(String),
}

impl WorkspaceConfig {
    /// The attribute name used inside a `workspaces` block.
    pub fn attribute_name(&self) -> &'static str {
        match self {
            WorkspaceConfig::Name(_) => "name",
            WorkspaceConfig::Prefix(_) => "prefix",
        }
    }

    /// The configured name or prefix.
    pub fn value(&self) -> &str {
        match self {
            WorkspaceConfig::Name(value) | WorkspaceConfig::Prefix(value) => value,
        }
    }
}
