use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;
use wall_tui::persist::POSTS_KEY;
use wall_tui::storage::{KeyValueStore, Options, Store};

fn wall_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wall-tui").expect("binary built");
    cmd.arg("--config")
        .arg(dir.join("missing-config.yaml"))
        .env("WALL_LOG__FILE", dir.join("wall.log"))
        .env("WALL_STORAGE__PATH", dir.join("wall.db"))
        .env_remove("WALL_PROFILE__NAME");
    cmd
}

#[test]
fn prints_version() {
    let dir = tempdir().unwrap();
    wall_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    let dir = tempdir().unwrap();
    wall_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wall-TUI"))
        .stdout(predicate::str::contains("--ephemeral"));
}

#[test]
fn empty_wall_prints_placeholder() {
    let dir = tempdir().unwrap();
    wall_cmd(dir.path())
        .args(["--ephemeral", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chibueze Williams · wall"))
        .stdout(predicate::str::contains("No posts yet. Be the first to share!"));
}

#[test]
fn print_reads_persisted_posts() {
    let dir = tempdir().unwrap();
    let store = Store::open(Options {
        path: Some(dir.path().join("wall.db")),
    })
    .unwrap();
    store
        .set(
            POSTS_KEY,
            r#"[{"id":"2","name":"Chibueze Williams","message":"second","created_at":"2020-01-02T00:00:00Z"},{"id":"1","name":"Chibueze Williams","message":"first","created_at":"2020-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
    store.close().unwrap();

    let output = wall_cmd(dir.path()).arg("--print").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("No posts yet"));
    let second = stdout.find("second").unwrap();
    let first = stdout.find("first").unwrap();
    assert!(second < first, "stdout was: {stdout}");
}

#[test]
fn corrupt_store_prints_empty_wall() {
    let dir = tempdir().unwrap();
    let store = Store::open(Options {
        path: Some(dir.path().join("wall.db")),
    })
    .unwrap();
    store.set(POSTS_KEY, "[{\"id\":").unwrap();
    store.close().unwrap();

    wall_cmd(dir.path())
        .arg("--print")
        .assert()
        .success()
        .stdout(predicate::str::contains("No posts yet"));
}

#[test]
fn profile_name_comes_from_env() {
    let dir = tempdir().unwrap();
    wall_cmd(dir.path())
        .args(["--ephemeral", "--print"])
        .env("WALL_PROFILE__NAME", "Ada Lovelace")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace · wall"));
}
