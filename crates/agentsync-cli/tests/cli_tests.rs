use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Fixture {
    tmp: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("dotfiles")).unwrap();
        fs::create_dir_all(root.join("live")).unwrap();

        let config = root.join("agentsync.yaml");
        fs::write(
            &config,
            format!(
                "settings:\n  backup_dir: {backups}\n  state_dir: {state}\ntools:\n  claude:\n    source: {source}\n    target: {target}\n",
                backups = root.join("backups").display(),
                state = root.join("state").display(),
                source = root.join("dotfiles").display(),
                target = root.join("live").display(),
            ),
        )
        .unwrap();
        Self { tmp, config }
    }

    fn source(&self) -> PathBuf {
        self.tmp.path().join("dotfiles")
    }

    fn target(&self) -> PathBuf {
        self.tmp.path().join("live")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("agentsync").unwrap();
        cmd.env("HOME", self.tmp.path())
            .env_remove("AGENTSYNC_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_help_output() {
    let mut cmd = Command::cargo_bin("agentsync").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Agent Configuration Synchronization Tool"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("list-backups"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("clean-backups"))
        .stdout(predicate::str::contains("init-config"))
        .stdout(predicate::str::contains("reset-state"));
}

#[test]
fn test_version_output() {
    let mut cmd = Command::cargo_bin("agentsync").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_conflicting_direction_flags() {
    let fixture = Fixture::new();
    fixture.cmd().args(["sync", "--push", "--pull"]).assert().failure();
}

#[test]
fn test_missing_config_suggests_init() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("agentsync").unwrap();
    cmd.env("HOME", tmp.path())
        .env("AGENTSYNC_CONFIG", tmp.path().join("missing.yaml"))
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("init-config"));
}

#[test]
fn test_init_config_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("config.yaml");

    let mut cmd = Command::cargo_bin("agentsync").unwrap();
    cmd.env("HOME", tmp.path())
        .args(["init-config", "--output"])
        .arg(&output)
        .assert()
        .success();
    assert!(fs::read_to_string(&output).unwrap().contains("tools:"));

    let mut again = Command::cargo_bin("agentsync").unwrap();
    again
        .env("HOME", tmp.path())
        .args(["init-config", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    let mut forced = Command::cargo_bin("agentsync").unwrap();
    forced
        .env("HOME", tmp.path())
        .args(["init-config", "--force", "--output"])
        .arg(&output)
        .assert()
        .success();
}

#[test]
fn test_push_sync_copies_new_file() {
    let fixture = Fixture::new();
    write(&fixture.source(), "skills/new.md", "# skill\n");

    fixture
        .cmd()
        .args(["sync", "--push", "--auto"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync Summary: claude (push)"))
        .stdout(predicate::str::contains("Created:   1"));

    assert_eq!(
        fs::read_to_string(fixture.target().join("skills/new.md")).unwrap(),
        "# skill\n"
    );
}

#[test]
fn test_missing_tool_directory_fails_only_that_tool() {
    let fixture = Fixture::new();
    let mut config = fs::read_to_string(&fixture.config).unwrap();
    config.push_str(&format!(
        "  codex:\n    source: {}\n    target: {}\n",
        fixture.tmp.path().join("gone").display(),
        fixture.tmp.path().join("codex").display(),
    ));
    fs::write(&fixture.config, config).unwrap();
    write(&fixture.source(), "CLAUDE.md", "rules\n");

    fixture
        .cmd()
        .args(["sync", "--push", "--auto"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Sync Summary: claude (push)"))
        .stderr(predicate::str::contains("Error: codex: Cannot scan"));

    assert!(fixture.target().join("CLAUDE.md").exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let fixture = Fixture::new();
    write(&fixture.source(), "CLAUDE.md", "rules\n");

    fixture
        .cmd()
        .args(["sync", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry Run Summary"))
        .stdout(predicate::str::contains("nothing written"));

    assert!(!fixture.target().join("CLAUDE.md").exists());
    assert!(!fixture.tmp.path().join("state").exists());
}

#[test]
fn test_unresolved_conflict_exits_nonzero() {
    let fixture = Fixture::new();
    write(&fixture.source(), "CLAUDE.md", "base\n");
    write(&fixture.target(), "CLAUDE.md", "base\n");
    fixture.cmd().args(["sync", "--auto"]).assert().success();

    write(&fixture.source(), "CLAUDE.md", "source edit\n");
    write(&fixture.target(), "CLAUDE.md", "target edit\n");

    fixture
        .cmd()
        .args(["sync", "--dry-run"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unresolved conflicts"))
        .stdout(predicate::str::contains("CLAUDE.md"));

    fixture
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("conflict"))
        .stdout(predicate::str::contains("modified on both sides"));
}

#[test]
fn test_status_lists_pending_copies() {
    let fixture = Fixture::new();
    write(&fixture.source(), "CLAUDE.md", "rules\n");

    fixture
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("last sync: never"))
        .stdout(predicate::str::contains("copy to target"))
        .stdout(predicate::str::contains("CLAUDE.md"));
}

#[test]
fn test_backup_listing_and_restore() {
    let fixture = Fixture::new();
    write(&fixture.source(), "CLAUDE.md", "v1\n");
    fixture.cmd().args(["sync", "--push", "--auto"]).assert().success();

    fixture
        .cmd()
        .arg("list-backups")
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found"));

    write(&fixture.source(), "CLAUDE.md", "v2\n");
    fixture.cmd().args(["sync", "--push", "--auto"]).assert().success();

    let output = fixture.cmd().arg("list-backups").output().unwrap();
    let listing = String::from_utf8(output.stdout).unwrap();
    let id = listing.split_whitespace().next().unwrap().to_string();
    assert!(listing.contains("claude"));
    assert!(listing.contains("push"));

    fixture
        .cmd()
        .args(["restore", &id, "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored"));
    assert_eq!(
        fs::read_to_string(fixture.target().join("CLAUDE.md")).unwrap(),
        "v1\n"
    );
}

#[test]
fn test_restore_unknown_backup_fails() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["restore", "20200101-000000-000-push-claude", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));
}

#[test]
fn test_clean_backups_with_yes() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["clean-backups", "--count", "0", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 backup(s)"));
}

#[test]
fn test_reset_state() {
    let fixture = Fixture::new();
    write(&fixture.source(), "CLAUDE.md", "rules\n");

    fixture
        .cmd()
        .args(["reset-state", "--tool", "claude", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No baseline recorded"));

    fixture.cmd().args(["sync", "--push", "--auto"]).assert().success();

    fixture
        .cmd()
        .args(["reset-state", "--tool", "claude", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Baseline of claude removed"));
}
