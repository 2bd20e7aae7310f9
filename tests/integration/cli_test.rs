//! End-to-end runs of the `sqlrun` binary.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

fn sqlrun(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("absent.toml");
    Command::new(env!("CARGO_BIN_EXE_sqlrun"))
        .current_dir(dir)
        .env_remove("DATABASE_URL")
        .arg("--config")
        .arg(&config)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_export_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("local.db").display());
    let out = dir.path().join("out.csv");

    let output = sqlrun(
        dir.path(),
        &["--url", &url, "--csv", out.to_str().unwrap(), "-q", "select 1 as n"],
    );
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "n\n1\n");
}

#[test]
fn test_connection_failure_keeps_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("missing").join("x.db").display());
    let out = dir.path().join("out.csv");
    std::fs::write(&out, "previous run\n").unwrap();

    let output = sqlrun(
        dir.path(),
        &["--url", &url, "--csv", out.to_str().unwrap(), "-q", "select 1"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous run\n");
}

#[test]
fn test_show_sql_needs_no_connection() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("plan.sql");

    let output = sqlrun(
        dir.path(),
        &["--show-sql", "--raw", out.to_str().unwrap(), "-q", "select 1; select 2"],
    );
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "select 1;\nselect 2;\n");
}

#[test]
fn test_show_sql_rejects_workbooks() {
    let dir = tempfile::tempdir().unwrap();
    let book = dir.path().join("plan.xlsx");

    let output = sqlrun(
        dir.path(),
        &["--show-sql", "--xls", book.to_str().unwrap(), "-q", "select 1"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!book.exists());
}
