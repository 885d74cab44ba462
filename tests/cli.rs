use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const VALID: &str = r#"
cluster_name: lab
talos_version: v1.7.0
proxmox:
  host: pve.lan
  user: root@pam
  password: secret
nodes:
  control_planes:
    - vm_id: 101
      ip_address: 192.168.1.101
      name: cp1
      cpu: 2
      memory: 4096
      disk: 32G
  workers:
    - vm_id: 201
      ip_address: 192.168.1.201
      name: w1
      cpu: 4
      memory: 8192
      disk: 64G
"#;

fn talos_pve() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("talos-pve").unwrap()
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("cluster-config.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_help_exits_successfully() {
    talos_pve().arg("--help").assert().success();
}

#[test]
fn test_version_exits_successfully() {
    talos_pve()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("talos-pve"));
}

#[test]
fn test_no_args_shows_usage() {
    talos_pve()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_subcommand_fails() {
    talos_pve()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_help_lists_all_subcommands() {
    let assert = talos_pve().arg("--help").assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    for cmd in [
        "init",
        "deploy",
        "destroy",
        "manage",
        "verify",
        "validate",
        "completions",
    ] {
        assert!(
            output.contains(cmd),
            "Help output should list '{}' subcommand",
            cmd
        );
    }
}

#[test]
fn test_deploy_help_lists_skip_flags() {
    let assert = talos_pve().args(["deploy", "--help"]).assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    for flag in [
        "--skip-prepare",
        "--skip-template",
        "--skip-nodes",
        "--skip-config",
        "--skip-apply",
        "--skip-bootstrap",
    ] {
        assert!(output.contains(flag), "deploy --help should list {flag}");
    }
}

#[test]
fn test_validate_lists_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), VALID);
    talos_pve()
        .args(["validate", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("cp1"))
        .stdout(predicate::str::contains("w1"))
        .stdout(predicate::str::contains("VMID"));
}

#[test]
fn test_validate_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), VALID);
    let assert = talos_pve()
        .args(["validate", "-o", "json", "-c"])
        .arg(&config)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("\"cluster_name\": \"lab\""));
    assert!(stdout.contains("\"vm_id\": 201"));
}

#[test]
fn test_validate_rejects_missing_control_planes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "cluster_name: lab\ntalos_version: v1.7.0\nproxmox: {}\n",
    );
    talos_pve()
        .args(["validate", "-c"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("control-plane"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    talos_pve()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cluster-config.yaml"));
}

#[test]
fn test_errors_are_prefixed_and_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    talos_pve()
        .current_dir(dir.path())
        .arg("verify")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[talos-pve]"))
        .stderr(predicate::str::contains("is not usable"));
}

#[test]
fn test_deploy_invalid_descriptor_fails_before_any_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "talos_version: v1.7.0\nproxmox: {}\n");
    talos_pve()
        .env("TALOS_PVE_WORKDIR", dir.path())
        .args(["deploy", "-c"])
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Step").not());
}

#[test]
fn test_deploy_with_every_stage_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), VALID);
    talos_pve()
        .env("TALOS_PVE_WORKDIR", dir.path())
        .args([
            "deploy",
            "--skip-prepare",
            "--skip-template",
            "--skip-nodes",
            "--skip-config",
            "--skip-apply",
            "--skip-bootstrap",
            "-c",
        ])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to do"));
}

#[test]
fn test_init_defaults_writes_valid_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new-cluster.yaml");
    talos_pve()
        .args(["init", "--defaults", "-o"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    talos_pve()
        .args(["validate", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("talos-cp-1"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), VALID);
    talos_pve()
        .args(["init", "--defaults", "-o"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(std::fs::read_to_string(&config).unwrap(), VALID);
}

#[test]
fn test_completions_bash() {
    talos_pve()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("talos-pve"));
}
