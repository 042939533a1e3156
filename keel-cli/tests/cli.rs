use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

/// Port 9 (discard) is closed on CI hosts, so requests fail fast.
const DEAD_REGISTRY: &str = "http://127.0.0.1:9";

fn keel_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_keel"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("KEEL_API_KEY")
        .env_remove("KEEL_API_URL")
        .env_remove("KEEL_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn init_project(home: &Path, project: &Path) {
    keel_cmd(home)
        .arg("--project-dir")
        .arg(project)
        .args(["init", "--name", "shop"])
        .assert()
        .success();
}

#[test]
fn init_creates_the_manifest() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["init", "--name", "shop"])
        .assert()
        .success()
        .stdout(contains("Initialized keel project 'shop'"));

    project
        .child(".keel/config.yaml")
        .assert(predicate::path::exists())
        .assert(contains("shop"));
}

#[test]
fn init_is_idempotent() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());
    let before = fs::read(project.child(".keel/config.yaml").path()).unwrap();

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["init", "--name", "other"])
        .assert()
        .success()
        .stdout(contains("already a keel project"));

    assert_eq!(fs::read(project.child(".keel/config.yaml").path()).unwrap(), before);
}

#[test]
fn sync_without_manifest_points_to_init() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["sync", "--non-interactive"])
        .env("KEEL_API_KEY", "test-key")
        .env("KEEL_API_URL", DEAD_REGISTRY)
        .assert()
        .failure()
        .stderr(contains("keel init"));
}

#[test]
fn interactive_sync_requires_a_tty() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["sync", "--interactive"])
        .env("KEEL_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(contains("requires a TTY"));
}

#[test]
fn interactive_and_non_interactive_conflict() {
    let home = assert_fs::TempDir::new().unwrap();

    keel_cmd(home.path())
        .args(["sync", "--interactive", "--non-interactive"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn missing_api_key_is_reported() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["sync", "--non-interactive"])
        .assert()
        .failure()
        .stderr(contains("no API key"));
}

#[test]
fn stored_credentials_supply_the_key() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());
    home.child(".keel/credentials.yaml")
        .write_str(&format!("api_key: stored-key\napi_url: {DEAD_REGISTRY}\n"))
        .unwrap();

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["sync", "--json", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("no API key").not())
        .stdout(contains("registry unreachable"));
}

#[test]
fn unreachable_registry_fails_json_dry_run_without_writing() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());
    let config = project.child(".keel/config.yaml");
    let before = fs::read(config.path()).unwrap();

    let assert = keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["sync", "--json", "--dry-run"])
        .env("KEEL_API_KEY", "test-key")
        .env("KEEL_API_URL", DEAD_REGISTRY)
        .assert()
        .failure();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(report["mode"], "non_interactive");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["tests"][0]["name"], "tests");
    assert_eq!(report["tests"][0]["action"], "list");
    assert!(report["tests"][0]["error"]
        .as_str()
        .unwrap()
        .contains("registry unreachable"));
    assert!(report["summary"]["errors"].as_u64().unwrap() >= 1);

    assert_eq!(fs::read(config.path()).unwrap(), before);
}

#[test]
fn human_output_groups_items_by_domain() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["sync", "--non-interactive", "--tests"])
        .env("KEEL_API_KEY", "test-key")
        .env("KEEL_API_URL", DEAD_REGISTRY)
        .assert()
        .failure()
        .stdout(contains("Sync mode: non_interactive"))
        .stdout(contains("Tests"))
        .stdout(contains("tests [error/list]"))
        .stdout(contains("Workflows").not())
        .stderr(contains("sync finished with 1 error(s)"));
}

#[test]
fn diff_of_unknown_alias_fails_before_contacting_the_registry() {
    let home = assert_fs::TempDir::new().unwrap();
    let project = assert_fs::TempDir::new().unwrap();
    init_project(home.path(), project.path());

    keel_cmd(home.path())
        .arg("--project-dir")
        .arg(project.path())
        .args(["diff", "nope"])
        .env("KEEL_API_KEY", "test-key")
        .env("KEEL_API_URL", DEAD_REGISTRY)
        .assert()
        .failure()
        .stderr(contains("unknown test alias `nope`"));
}

#[test]
fn help_lists_subcommands() {
    let home = assert_fs::TempDir::new().unwrap();

    keel_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("init"))
        .stdout(contains("sync"))
        .stdout(contains("status"))
        .stdout(contains("diff"));
}
