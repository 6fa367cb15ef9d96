//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory)
//! and merging them with command-line flags.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use tfmigrate::{MigrateError, MigrationConfig};
use tfmigrate_core::backend::{DEFAULT_HOSTNAME, RemoteBackendConfig, WorkspaceConfig};

use crate::Args;

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for MigrateError {
    fn from(err: ConfigError) -> Self {
        MigrateError::Config(err.to_string())
    }
}

/// Settings read from a configuration file.
///
/// Every field is optional so that flags can supply what the file leaves
/// out.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub hostname: Option<String>,
    pub organization: Option<String>,
    pub workspace_name: Option<String>,
    pub workspace_prefix: Option<String>,
    pub workspace_variable: Option<String>,
    pub tfvars_filename: Option<String>,
    pub modules: Option<PathBuf>,
}

impl FileConfig {
    /// Override the file's settings with the flags given on the command line.
    ///
    /// A workspace flag replaces both workspace settings of the file, so a
    /// file with a prefix can be used with `--workspace-name`.
    pub fn merge(mut self, args: &Args) -> Self {
        if args.workspace_name.is_some() || args.workspace_prefix.is_some() {
            self.workspace_name = args.workspace_name.clone();
            self.workspace_prefix = args.workspace_prefix.clone();
        }
        override_with(&mut self.hostname, &args.hostname);
        override_with(&mut self.organization, &args.organization);
        override_with(&mut self.workspace_variable, &args.workspace_variable);
        override_with(&mut self.tfvars_filename, &args.tfvars_filename);
        override_with(&mut self.modules, &args.modules);
        self
    }

    /// Validate the settings and build the migration configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the organization is missing or
    /// if not exactly one of workspace name and prefix is set.
    pub fn resolve(self) -> Result<MigrationConfig, ConfigError> {
        let organization = self.organization.ok_or_else(|| {
            ConfigError::Validation("an organization is required".to_string())
        })?;

        let workspaces = match (self.workspace_name, self.workspace_prefix) {
            (Some(name), None) => WorkspaceConfig::Name(name),
            (None, Some(prefix)) => WorkspaceConfig::Prefix(prefix),
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "only one of workspace name and workspace prefix may be set".to_string(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::Validation(
                    "a workspace name or workspace prefix is required".to_string(),
                ));
            }
        };

        let hostname = self
            .hostname
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
        let mut config =
            MigrationConfig::new(RemoteBackendConfig::new(hostname, organization, workspaces));
        if let Some(variable) = self.workspace_variable {
            config = config.with_workspace_variable(variable);
        }
        if let Some(filename) = self.tfvars_filename {
            config = config.with_tfvars_filename(filename);
        }
        if let Some(modules) = self.modules {
            config = config.with_modules_dir(modules);
        }
        Ok(config)
    }
}

fn override_with<T: Clone>(setting: &mut Option<T>, flag: &Option<T>) {
    if let Some(value) = flag {
        *setting = Some(value.clone());
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (tfmigrate/config.toml)
/// 3. Platform-specific config directory
/// 4. Empty config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be read or parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<FileConfig, ConfigError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("tfmigrate/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "tfmigrate", "tfmigrate") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using flags only");
    Ok(FileConfig::default())
}

/// Load configuration from a TOML file
fn load_config_file(path: impl AsRef<Path>) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}
