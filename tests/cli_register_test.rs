// End-to-end checks for the golf-register binary against a temporary store

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn register(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("golf-register").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .arg("register")
        .arg("--store")
        .arg(dir.path().join("players.jsonl"));
    cmd
}

fn valid_args(username: &str) -> Vec<String> {
    [
        "--username", username,
        "--name", "Tiger",
        "--email", "tiger@golf.com",
        "--contact", "+65 91234567",
        "--hand", "left",
        "--product", "Shoes",
        "--consent",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn test_register_success_prints_username_reminder() {
    let dir = TempDir::new().unwrap();

    register(&dir)
        .args(valid_args("tiger"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Remember your username tiger"));

    let contents = std::fs::read_to_string(dir.path().join("players.jsonl")).unwrap();
    assert_eq!(contents.lines().count(), 1);
    let line: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
    assert_eq!(line["username"], "tiger");
    assert_eq!(line["isLeftHand"], true);
}

#[test]
fn test_register_reports_every_invalid_field() {
    let dir = TempDir::new().unwrap();

    register(&dir)
        .args(["--username", "ab", "--email", "abc"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("identifier:"))
        .stdout(predicate::str::contains("display_name:"))
        .stdout(predicate::str::contains("email:"))
        .stdout(predicate::str::contains("contact_number:"))
        .stdout(predicate::str::contains("owned_products:"))
        .stdout(predicate::str::contains("consent:"));

    assert!(!dir.path().join("players.jsonl").exists());
}

#[test]
fn test_register_duplicate_username_conflicts() {
    let dir = TempDir::new().unwrap();

    register(&dir).args(valid_args("tiger")).assert().success();
    register(&dir)
        .args(valid_args("tiger"))
        .assert()
        .code(3)
        .stdout(predicate::str::contains("already taken"));

    let contents = std::fs::read_to_string(dir.path().join("players.jsonl")).unwrap();
    assert_eq!(contents.lines().count(), 1);
}

#[test]
fn test_policy_command_prints_defaults() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("golf-register")
        .unwrap()
        .current_dir(dir.path())
        .arg("policy")
        .assert()
        .success()
        .stdout(predicate::str::contains("identifier = \"required\""))
        .stdout(predicate::str::contains("max_name_len = 20"));
}

#[test]
fn test_policy_command_reads_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("golf-registration.toml"),
        "[policy]\nidentifier = \"disabled\"\n",
    )
    .unwrap();

    Command::cargo_bin("golf-register")
        .unwrap()
        .current_dir(dir.path())
        .arg("policy")
        .assert()
        .success()
        .stdout(predicate::str::contains("identifier = \"disabled\""));
}
