//! CLI smoke and end-to-end tests for stratum.
//!
//! Every test points STRATUM_HOME at its own temp directory, so tests
//! are independent and run in parallel.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn stratum(home: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("stratum");
  cmd.env("STRATUM_HOME", home.path());
  cmd
}

/// Create a home directory with an index of installable packages.
fn home_with_index(packages: &[(&str, &str)]) -> TempDir {
  let temp = TempDir::new().unwrap();
  let packages: Vec<serde_json::Value> = packages
    .iter()
    .map(|(name, version)| {
      serde_json::json!({
        "name": name,
        "version": version,
        "outputs": ["out"],
        "items": { "out": format!("/stratum/store/{name}-{version}-out") },
      })
    })
    .collect();
  let index = serde_json::json!({ "version": 1, "packages": packages });
  std::fs::write(temp.path().join("index.json"), index.to_string()).unwrap();
  temp
}

#[test]
fn help_flag_works() {
  let home = TempDir::new().unwrap();
  stratum(&home)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let home = TempDir::new().unwrap();
  stratum(&home)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("stratum"));
}

#[test]
fn subcommand_help_works() {
  let home = TempDir::new().unwrap();
  for cmd in &["install", "remove", "upgrade", "list", "generations"] {
    stratum(&home)
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn install_then_list() {
  let home = home_with_index(&[("hello", "2.12")]);

  stratum(&home)
    .args(["install", "hello"])
    .assert()
    .success()
    .stdout(predicate::str::contains("generation 1 is now current"));

  stratum(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("hello").and(predicate::str::contains("2.12")));
}

#[test]
fn install_unknown_package_fails() {
  let home = home_with_index(&[]);
  stratum(&home)
    .args(["install", "ghost"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found"));
}

#[test]
fn install_without_arguments_fails() {
  let home = home_with_index(&[]);
  stratum(&home)
    .arg("install")
    .assert()
    .failure()
    .stderr(predicate::str::contains("nothing to install"));
}

#[test]
fn reinstall_is_nothing_to_do() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home)
    .args(["install", "hello"])
    .assert()
    .success()
    .stdout(predicate::str::contains("nothing to be done"));
}

#[test]
fn dry_run_reports_without_publishing() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home)
    .args(["install", "hello", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("would build"));

  stratum(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("no packages installed"));
}

#[test]
fn remove_uninstalled_package_fails() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home)
    .args(["remove", "ghost"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not installed"));
}

#[test]
fn remove_then_list_is_empty() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home).args(["remove", "hello"]).assert().success();
  stratum(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("no packages installed"));
}

#[test]
fn generations_list_marks_current() {
  let home = home_with_index(&[("hello", "2.12"), ("ripgrep", "14.0")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home).args(["install", "ripgrep"]).assert().success();

  stratum(&home)
    .args(["generations", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Generation 2 (current)"));
}

#[test]
fn rollback_and_switch() {
  let home = home_with_index(&[("hello", "2.12"), ("ripgrep", "14.0")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home).args(["install", "ripgrep"]).assert().success();

  stratum(&home)
    .args(["generations", "rollback"])
    .assert()
    .success()
    .stdout(predicate::str::contains("switched to generation 1"));

  stratum(&home)
    .args(["generations", "switch", "2"])
    .assert()
    .success()
    .stdout(predicate::str::contains("switched to generation 2"));
}

#[test]
fn rollback_from_first_generation_reaches_the_baseline() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();

  stratum(&home)
    .args(["generations", "rollback"])
    .assert()
    .success()
    .stdout(predicate::str::contains("switched to generation 0"));

  stratum(&home)
    .args(["list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("hello").not());
}

#[test]
fn rollback_on_empty_profile_fails() {
  let home = home_with_index(&[]);
  stratum(&home)
    .args(["generations", "rollback"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("nothing to roll back"));
}

#[test]
fn delete_generations_keeps_the_current_one() {
  let home = home_with_index(&[("hello", "2.12"), ("ripgrep", "14.0")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home).args(["install", "ripgrep"]).assert().success();

  stratum(&home)
    .args(["generations", "delete", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("deleted generation(s) 1"));

  stratum(&home)
    .args(["generations", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Generation 2 (current)").and(predicate::str::contains("Generation 1").not()));
}

#[test]
fn delete_without_force_fails_non_interactively() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home)
    .args(["generations", "delete"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));
}

#[test]
fn invalid_generation_pattern_is_rejected() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();
  stratum(&home)
    .args(["generations", "delete", "--force", "5..2"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid generation pattern"));
}

#[test]
fn upgrade_picks_up_a_refreshed_index() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();

  // Refresh the index with a newer version.
  let index = serde_json::json!({
    "version": 1,
    "packages": [{
      "name": "hello",
      "version": "2.13",
      "outputs": ["out"],
      "items": { "out": "/stratum/store/hello-2.13-out" },
    }],
  });
  std::fs::write(home.path().join("index.json"), index.to_string()).unwrap();

  stratum(&home)
    .arg("upgrade")
    .assert()
    .success()
    .stdout(predicate::str::contains("generation 2 is now current"));

  stratum(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("2.13"));
}

#[test]
fn list_json_output() {
  let home = home_with_index(&[("hello", "2.12")]);
  stratum(&home).args(["install", "hello"]).assert().success();

  let output = stratum(&home).args(["list", "-o", "json"]).output().unwrap();
  assert!(output.status.success());
  let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(entries[0]["name"], "hello");
}

#[test]
fn explicit_profile_flag() {
  let home = home_with_index(&[("hello", "2.12")]);
  let profile = home.path().join("profiles").join("work");

  stratum(&home)
    .args(["install", "hello", "--profile"])
    .arg(&profile)
    .assert()
    .success();

  stratum(&home)
    .args(["list", "--profile"])
    .arg(&profile)
    .assert()
    .success()
    .stdout(predicate::str::contains("hello"));

  // The default profile is untouched.
  stratum(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("no packages installed"));
}

#[test]
fn missing_index_file_is_warned_about() {
  let home = TempDir::new().unwrap();
  stratum(&home)
    .args(["list"])
    .assert()
    .success()
    .stderr(predicate::str::contains("does not exist; using an empty index"));
}

#[test]
fn corrupt_index_is_a_clean_error() {
  let home = TempDir::new().unwrap();
  std::fs::write(home.path().join("index.json"), "not json").unwrap();
  stratum(&home)
    .args(["install", "hello"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("index"));
}
