use std::{fs, path::Path};

use clap::Parser;
use tempfile::tempdir;

use tfmigrate::MigrateError;
use tfmigrate_cli::{Args, run};

fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn args(root: &Path, extra: &[&str]) -> Args {
    let module = root.join("app");
    let mut argv = vec![
        "tfmigrate".to_string(),
        module.display().to_string(),
        "--log-level".to_string(),
        "off".to_string(),
        "-o".to_string(),
        "acme".to_string(),
    ];
    argv.extend(extra.iter().map(|arg| arg.to_string()));
    Args::parse_from(argv)
}

#[test]
fn e2e_smoke_test_migrates_module() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let root = temp_dir.path();
    write(
        root,
        "app/main.tf",
        "resource \"null_resource\" \"env\" {\n  triggers = {\n    env = terraform.workspace\n  }\n}\n",
    );
    write(root, "app/terraform.tfvars", "size = 3\n");
    write(
        root,
        "consumers/web/main.tf",
        "data \"terraform_remote_state\" \"app\" {\n  backend = \"local\"\n  config  = {}\n}\n",
    );

    let modules = root.join("consumers").display().to_string();
    run(&args(root, &["-p", "app-", "-m", &modules])).expect("migration failed");

    let backend = fs::read_to_string(root.join("app/backend.tf")).unwrap();
    assert!(backend.contains("backend \"remote\""));
    assert!(backend.contains("organization = \"acme\""));
    assert!(backend.contains("prefix = \"app-\""));

    let main = fs::read_to_string(root.join("app/main.tf")).unwrap();
    assert!(main.contains("env = var.environment"));
    assert!(root.join("app/variables.tf").exists());

    assert!(!root.join("app/terraform.tfvars").exists());
    assert_eq!(
        fs::read_to_string(root.join("app/terraform.auto.tfvars")).unwrap(),
        "size = 3\n"
    );

    // The module had no backend, so nothing read its state
    assert_eq!(
        fs::read_to_string(root.join("consumers/web/main.tf")).unwrap(),
        "data \"terraform_remote_state\" \"app\" {\n  backend = \"local\"\n  config  = {}\n}\n"
    );

    // A second run finds nothing left to do
    run(&args(root, &["-p", "app-"])).expect("second run failed");
    assert_eq!(fs::read_to_string(root.join("app/main.tf")).unwrap(), main);
}

#[test]
fn e2e_smoke_test_dry_run_writes_nothing() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let root = temp_dir.path();
    let src = "output \"env\" {\n  value = terraform.workspace\n}\n";
    write(root, "app/outputs.tf", src);

    run(&args(root, &["-n", "app", "--dry-run"])).expect("dry run failed");

    assert_eq!(fs::read_to_string(root.join("app/outputs.tf")).unwrap(), src);
    assert!(!root.join("app/backend.tf").exists());
}

#[test]
fn e2e_smoke_test_errors() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let root = temp_dir.path();

    // Not a module directory
    fs::create_dir_all(root.join("app")).unwrap();
    let err = run(&args(root, &["-n", "app"])).unwrap_err();
    assert!(matches!(err, MigrateError::Diagnostics { .. }));

    // Invalid configuration leaves the files alone
    let src = "locals {\n  env = terraform.workspace\n";
    write(root, "app/main.tf", src);
    let err = run(&args(root, &["-n", "app"])).unwrap_err();
    assert!(matches!(err, MigrateError::Diagnostics { .. }));
    assert_eq!(fs::read_to_string(root.join("app/main.tf")).unwrap(), src);

    // Missing workspace settings
    let err = run(&args(root, &[])).unwrap_err();
    assert!(matches!(err, MigrateError::Config(_)));
}
