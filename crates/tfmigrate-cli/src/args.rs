//! Command-line argument definitions for the tfmigrate CLI.
//!
//! Flags override the matching settings of the configuration file.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the tfmigrate tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the Terraform module to migrate
    #[arg(default_value = ".")]
    pub module: PathBuf,

    /// Hostname of the remote backend
    #[arg(long)]
    pub hostname: Option<String>,

    /// Organization owning the workspaces
    #[arg(short, long)]
    pub organization: Option<String>,

    /// Name of the single workspace the module uses
    #[arg(short = 'n', long, conflicts_with = "workspace_prefix")]
    pub workspace_name: Option<String>,

    /// Prefix of the workspaces the module uses
    #[arg(short = 'p', long)]
    pub workspace_prefix: Option<String>,

    /// Variable replacing terraform.workspace
    #[arg(long)]
    pub workspace_variable: Option<String>,

    /// New name of terraform.tfvars
    #[arg(long)]
    pub tfvars_filename: Option<String>,

    /// Directory of modules whose remote state data sources are updated
    #[arg(short, long)]
    pub modules: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the changes without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
