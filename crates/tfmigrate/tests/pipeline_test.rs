use std::path::Path;

use tfmigrate::{
    Change, ChangeSet, MigrateError, Migration, MigrationConfig, Writer,
    fs::{FileSystem, MemoryFileSystem},
    steps::{Step, Steps, Tfvars},
};
use tfmigrate_core::backend::{RemoteBackendConfig, WorkspaceConfig};
use tfmigrate_hcl::error::{Diagnostics, ErrorCode};

const S3_BACKEND: &str = concat!(
    "terraform {\n",
    "  backend \"s3\" {\n",
    "    bucket = \"terraform-state\"\n",
    "    key    = \"terraform.tfstate\"\n",
    "    region = \"us-east-1\"\n",
    "  }\n",
    "}\n",
);

const REMOTE_BACKEND: &str = concat!(
    "terraform {\n",
    "  backend \"remote\" {\n",
    "    hostname     = \"host.name\"\n",
    "    organization = \"org\"\n",
    "\n",
    "    workspaces {\n",
    "      name = \"ws\"\n",
    "    }\n",
    "  }\n",
    "}\n",
);

const CONSUMER: &str = concat!(
    "data \"terraform_remote_state\" \"match\" {\n",
    "  backend = \"s3\"\n",
    "  config = {\n",
    "    bucket = \"terraform-state\"\n",
    "    key    = \"terraform.tfstate\"\n",
    "    region = \"us-east-1\"\n",
    "  }\n",
    "}\n",
    "\n",
    "data \"terraform_remote_state\" \"wrong_type\" {\n",
    "  backend = \"local\"\n",
    "  config = {\n",
    "    path = \"terraform.tfstate\"\n",
    "  }\n",
    "}\n",
    "\n",
    "data \"terraform_remote_state\" \"wrong_config\" {\n",
    "  backend = \"s3\"\n",
    "  config = {\n",
    "    bucket = \"other-state\"\n",
    "    key    = \"terraform.tfstate\"\n",
    "    region = \"us-east-1\"\n",
    "  }\n",
    "}\n",
);

fn config(workspaces: WorkspaceConfig) -> MigrationConfig {
    MigrationConfig::new(RemoteBackendConfig::new("host.name", "org", workspaces))
        .with_modules_dir("modules")
}

fn fixture() -> MemoryFileSystem {
    MemoryFileSystem::with_files([
        ("app/backend.tf", S3_BACKEND),
        (
            "app/main.tf",
            "output \"env\" {\n  value = terraform.workspace\n}\n",
        ),
        ("app/terraform.tfvars", "region = \"us-east-1\"\n"),
        ("modules/consumer/main.tf", CONSUMER),
    ])
}

fn contents(changes: &ChangeSet, path: &str) -> String {
    String::from_utf8(changes.get(Path::new(path)).unwrap().bytes()).unwrap()
}

#[test]
fn test_full_migration() {
    let fs = fixture();
    let config = config(WorkspaceConfig::Name("ws".to_string()));
    let (migration, diagnostics) = Migration::new(&fs, Path::new("app"), &config);
    assert!(diagnostics.is_empty(), "{diagnostics}");
    let migration = migration.unwrap();

    let (changes, diagnostics) = migration.changes();
    assert!(diagnostics.is_empty(), "{diagnostics}");
    assert_eq!(
        changes.paths().collect::<Vec<_>>(),
        [
            Path::new("app/backend.tf"),
            Path::new("app/main.tf"),
            Path::new("app/terraform.tfvars"),
            Path::new("app/variables.tf"),
            Path::new("modules/consumer/main.tf"),
        ]
    );

    assert_eq!(contents(&changes, "app/backend.tf"), REMOTE_BACKEND);
    assert_eq!(
        contents(&changes, "app/main.tf"),
        "output \"env\" {\n  value = var.environment\n}\n"
    );
    assert_eq!(
        contents(&changes, "app/variables.tf"),
        concat!(
            "variable \"environment\" {\n",
            "  type        = string\n",
            "  description = \"The environment where the module will be deployed\"\n",
            "}\n",
        )
    );

    let tfvars = changes.get(Path::new("app/terraform.tfvars")).unwrap();
    assert_eq!(tfvars.rename(), Some("terraform.auto.tfvars"));

    let consumer = contents(&changes, "modules/consumer/main.tf");
    assert_eq!(
        consumer,
        CONSUMER.replacen(
            concat!(
                "  backend = \"s3\"\n",
                "  config = {\n",
                "    bucket = \"terraform-state\"\n",
                "    key    = \"terraform.tfstate\"\n",
                "    region = \"us-east-1\"\n",
                "  }\n",
            ),
            concat!(
                "  backend = \"remote\"\n",
                "  config = {\n",
                "    hostname     = \"host.name\"\n",
                "    organization = \"org\"\n",
                "\n",
                "    workspaces = {\n",
                "      name = \"ws\"\n",
                "    }\n",
                "  }\n",
            ),
            1
        )
    );

    migration.write(&changes).unwrap();
    assert!(!fs.exists("app/terraform.tfvars"));
    assert_eq!(
        fs.contents("app/terraform.auto.tfvars").unwrap(),
        "region = \"us-east-1\"\n"
    );
    assert_eq!(fs.contents("app/backend.tf").unwrap(), REMOTE_BACKEND);
}

#[test]
fn test_second_run_changes_nothing() {
    let fs = fixture();
    let config = config(WorkspaceConfig::Name("ws".to_string()));

    let (migration, _) = Migration::new(&fs, Path::new("app"), &config);
    let (changes, diagnostics) = migration.unwrap().apply().unwrap();
    assert!(!changes.is_empty());
    assert!(!diagnostics.has_errors());

    let (migration, diagnostics) = Migration::new(&fs, Path::new("app"), &config);
    assert!(diagnostics.is_empty(), "{diagnostics}");
    let migration = migration.unwrap();
    let (changes, diagnostics) = migration.changes();
    assert!(changes.is_empty(), "{:?}", changes.paths().collect::<Vec<_>>());
    assert!(!diagnostics.has_errors());
    assert_eq!(migration.pending_steps().count(), 0);
}

#[test]
fn test_prefixed_workspaces() {
    let fs = MemoryFileSystem::with_files([
        ("app/backend.tf", S3_BACKEND),
        (
            "modules/consumer/main.tf",
            concat!(
                "data \"terraform_remote_state\" \"app\" {\n",
                "  backend = \"s3\"\n",
                "  config = {\n",
                "    bucket = \"terraform-state\"\n",
                "    key    = \"terraform.tfstate\"\n",
                "    region = \"us-east-1\"\n",
                "  }\n",
                "  workspace = terraform.workspace\n",
                "}\n",
            ),
        ),
    ]);
    let config = config(WorkspaceConfig::Prefix("ws-".to_string()));
    let (migration, _) = Migration::new(&fs, Path::new("app"), &config);
    let (changes, diagnostics) = migration.unwrap().changes();
    assert!(diagnostics.is_empty(), "{diagnostics}");

    assert_eq!(
        contents(&changes, "modules/consumer/main.tf"),
        concat!(
            "data \"terraform_remote_state\" \"app\" {\n",
            "  backend = \"remote\"\n",
            "  config = {\n",
            "    hostname     = \"host.name\"\n",
            "    organization = \"org\"\n",
            "\n",
            "    workspaces = {\n",
            "      name = \"ws-${terraform.workspace}\"\n",
            "    }\n",
            "  }\n",
            "}\n",
        )
    );
}

#[test]
fn test_without_modules_dir_remote_state_is_untouched() {
    let fs = fixture();
    let config = MigrationConfig::new(RemoteBackendConfig::new(
        "host.name",
        "org",
        WorkspaceConfig::Name("ws".to_string()),
    ));
    let (migration, _) = Migration::new(&fs, Path::new("app"), &config);
    let (changes, _) = migration.unwrap().changes();
    assert!(changes.get(Path::new("modules/consumer/main.tf")).is_none());
    assert_eq!(changes.len(), 4);
}

#[test]
fn test_non_constant_config_is_untouched() {
    let dynamic = concat!(
        "data \"terraform_remote_state\" \"dynamic\" {\n",
        "  backend = \"s3\"\n",
        "  config = {\n",
        "    bucket = \"terraform-state\"\n",
        "    key    = var.k\n",
        "    region = \"us-east-1\"\n",
        "  }\n",
        "}\n",
    );
    let fs = MemoryFileSystem::with_files([
        ("app/backend.tf", S3_BACKEND.to_string()),
        ("modules/dynamic/main.tf", dynamic.to_string()),
        ("modules/consumer/main.tf", format!("{dynamic}\n{CONSUMER}")),
    ]);
    let config = config(WorkspaceConfig::Name("ws".to_string()));
    let (migration, _) = Migration::new(&fs, Path::new("app"), &config);
    let migration = migration.unwrap();
    let (changes, diagnostics) = migration.changes();
    assert!(diagnostics.is_empty(), "{diagnostics}");

    assert!(changes.get(Path::new("modules/dynamic/main.tf")).is_none());
    let consumer = contents(&changes, "modules/consumer/main.tf");
    assert!(consumer.starts_with(dynamic));
    assert!(consumer.contains("data \"terraform_remote_state\" \"match\" {\n  backend = \"remote\"\n"));

    migration.write(&changes).unwrap();
    assert_eq!(fs.contents("modules/dynamic/main.tf").unwrap(), dynamic);
}

#[test]
fn test_invalid_utf8_file_is_never_rewritten() {
    let original = b"# caf\xe9\nlocals {\n  env = terraform.workspace\n}\n".to_vec();
    let fs = MemoryFileSystem::with_files([("app/main.tf", original.clone())]);
    let config = MigrationConfig::new(RemoteBackendConfig::new(
        "host.name",
        "org",
        WorkspaceConfig::Name("ws".to_string()),
    ));

    let (migration, diagnostics) = Migration::new(&fs, Path::new("app"), &config);
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code(), Some(ErrorCode::E401));
    assert_eq!(error.subject().unwrap().filename(), Path::new("app/main.tf"));

    let migration = migration.unwrap();
    let (changes, _) = migration.changes();
    assert!(changes.get(Path::new("app/main.tf")).is_none());

    let err = migration.apply().unwrap_err();
    assert!(matches!(err, MigrateError::Diagnostics { .. }));
    assert_eq!(fs.read(Path::new("app/main.tf")).unwrap(), original);
    assert!(!fs.exists("app/backend.tf"));
}

#[test]
fn test_syntax_error_is_reported_once() {
    let fs = MemoryFileSystem::with_files([(
        "app/main.tf",
        "locals {\n  env = terraform.workspace\n  bad =\n}\n",
    )]);
    let config = MigrationConfig::new(RemoteBackendConfig::new(
        "host.name",
        "org",
        WorkspaceConfig::Name("ws".to_string()),
    ));

    let (migration, mut diagnostics) = Migration::new(&fs, Path::new("app"), &config);
    let (_, step_diagnostics) = migration.unwrap().changes();
    diagnostics.append(step_diagnostics);

    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1, "{diagnostics}");
    assert_eq!(errors[0].code(), Some(ErrorCode::E100));
    assert_eq!(errors[0].summary(), "Missing expression");
}

/// Moves `terraform.tfvars` to a fixed name.
struct ArchiveTfvars;

impl Step for ArchiveTfvars {
    fn name(&self) -> &str {
        "Archive tfvars"
    }

    fn description(&self) -> &str {
        "keeps a copy of the variables"
    }

    fn complete(&self, _: &Writer<'_>) -> bool {
        false
    }

    fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
        let path = writer.module_path("terraform.tfvars");
        let (doc, diagnostics) = writer.file(&path);
        let doc = doc.unwrap();
        (
            ChangeSet::single(path, Change::new(doc).with_rename("archive.tfvars")),
            diagnostics,
        )
    }
}

#[test]
fn test_first_rename_wins() {
    let fs = fixture();
    let (writer, _) = Writer::new(&fs, Path::new("app"));
    let writer = writer.unwrap();

    let mut steps = Steps::new();
    steps.push(Tfvars::new("terraform.auto.tfvars"));
    steps.push(ArchiveTfvars);
    let (changes, diagnostics) = steps.changes(&writer);

    let tfvars = changes.get(Path::new("app/terraform.tfvars")).unwrap();
    assert_eq!(tfvars.rename(), Some("terraform.auto.tfvars"));

    let warnings: Vec<_> = diagnostics.iter().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code(), Some(ErrorCode::E500));
    assert_eq!(
        warnings[0].subject().unwrap().filename(),
        Path::new("app/archive.tfvars")
    );
}
