//! CLI smoke tests. None of these reach the network.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// Create a new `Command` with our binary, pointed at an empty cache in `dir`.
fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("medscan").unwrap();
    cmd.current_dir(dir.path())
        .env("MEDSCAN__CACHE__PATH", dir.path().join("cache.json"))
        .env("MEDSCAN__DOCUMENTS__DIR", dir.path().join("data"))
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_help() {
    let dir = tempdir().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("identify"))
        .stdout(predicate::str::contains("MEDSCAN__"));
}

#[test]
fn test_version() {
    let dir = tempdir().unwrap();
    cmd(&dir).arg("--version").assert().success();
}

#[test]
fn test_search_empty_cache() {
    let dir = tempdir().unwrap();
    cmd(&dir)
        .args(["search", "ibuprofeno"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_search_reads_cache_file() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("cache.json"),
        r#"{"version":1,"medications":[
            {"code":"654321","name":"IBUPROFENO","resolved_at":"2024-01-31T10:00:00Z"},
            {"code":"712345","name":"PARACETAMOL","resolved_at":"2024-01-31T10:00:00Z"}
        ]}"#,
    )
    .unwrap();

    cmd(&dir)
        .args(["search", "parace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("712345"))
        .stdout(predicate::str::contains("\"high\""))
        .stdout(predicate::str::contains("654321").not());
}

#[test]
fn test_invalidate_missing_code() {
    let dir = tempdir().unwrap();
    cmd(&dir)
        .args(["invalidate", "654321"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no estaba en la caché"));
}

#[test]
fn test_lookup_rejects_malformed_code() {
    let dir = tempdir().unwrap();
    cmd(&dir)
        .args(["lookup", "12ab"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no es un código nacional"));
}

#[test]
fn test_identify_missing_file() {
    let dir = tempdir().unwrap();
    cmd(&dir)
        .args(["identify", "no-such-photo.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_chat_requires_gemini_key() {
    let dir = tempdir().unwrap();
    cmd(&dir)
        .env_remove("MEDSCAN__GEMINI__API_KEY")
        .args(["chat", "Ficha.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MEDSCAN__GEMINI__API_KEY"));
}
