//! End-to-end CLI tests for the bookshelf binary.
//!
//! Every test points the XDG directories at a temp dir so no user config or
//! library is touched. None of these tests reach the network.

#![allow(deprecated)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bookshelf(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_displays_usage() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep a library of serialized books"))
        .stdout(predicate::str::contains("update"));
}

#[test]
fn test_version_displays_name() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bookshelf"));
}

#[test]
fn test_missing_subcommand_fails() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_sources_lists_bundled_adapters() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("read_novel_full"))
        .stdout(predicate::str::contains("reddit"))
        .stdout(predicate::str::contains("novel_updates"))
        .stdout(predicate::str::contains("baka_updates"));
}

#[test]
fn test_list_on_fresh_database_is_empty() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("lib.db");
    bookshelf(home.path())
        .args(["-q", "list", "--database"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Library is empty."));
    assert!(db.exists());
}

#[test]
fn test_default_database_lives_under_xdg_data_home() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path()).args(["-q", "list"]).assert().success();
    assert!(home.path().join("data/bookshelf/library.db").exists());
}

#[test]
fn test_add_then_list_shows_book() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("nested/dir/lib.db");
    bookshelf(home.path())
        .args(["-q", "add", "https://readnovelfull.com/sword.html", "--title", "Sword"])
        .arg("--database")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 'Sword'."));

    bookshelf(home.path())
        .args(["-q", "list", "--database"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sword"))
        .stdout(predicate::str::contains("https://readnovelfull.com/sword.html"));
}

#[test]
fn test_update_with_empty_library_reports_nothing() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .args(["-q", "update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to update."));
}

#[test]
fn test_unknown_database_id_fails_with_known_ids() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .args(["-q", "search", "nope", "slime"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown database 'nope'"))
        .stderr(predicate::str::contains("novel_updates"));
}

#[test]
fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "request_timeout_secs = 0\n").unwrap();
    bookshelf(home.path())
        .arg("--config")
        .arg(&config)
        .arg("sources")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_default_config_file_is_read() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join("config/bookshelf");
    std::fs::create_dir_all(&config_dir).unwrap();
    let db = home.path().join("from-config.db");
    std::fs::write(
        config_dir.join("config.toml"),
        format!("database_path = {:?}\nverbosity = \"quiet\"\n", db.display().to_string()),
    )
    .unwrap();

    bookshelf(home.path()).arg("list").assert().success();
    assert!(db.exists());
}

#[test]
fn test_timeout_out_of_range_rejected() {
    let home = TempDir::new().unwrap();
    bookshelf(home.path())
        .args(["--timeout", "0", "sources"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout"));
}
