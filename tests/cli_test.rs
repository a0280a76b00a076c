//! CLI integration tests

#![cfg(feature = "cli")]

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use common::{build_pak, header, record, write_pak};

fn cli_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_safe_unpak"))
}

fn create_test_pak(dir: &Path) -> PathBuf {
    let files: &[(&str, &[u8])] = &[
        ("hello.txt", b"Hello, World!"),
        ("subdir/nested.txt", b"Nested content"),
    ];
    write_pak(dir, "test.pak", &build_pak(files))
}

#[test]
fn test_cli_help() {
    let output = cli_binary().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Secure Quake PAK extraction"));
    assert!(stdout.contains("--list"));
    assert!(stdout.contains("--verify"));
    assert!(stdout.contains("--dest"));
}

#[test]
fn test_cli_version() {
    let output = cli_binary().arg("--version").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("safe_unpak"));
}

#[test]
fn test_cli_no_args_prints_usage() {
    let output = cli_binary().output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: safe_unpak <ARCHIVE>"));
}

#[test]
fn test_cli_extract_next_to_archive() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary().arg(&pak).output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(temp.path().join("hello.txt")).unwrap(),
        "Hello, World!"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("subdir/nested.txt")).unwrap(),
        "Nested content"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Extracted 2 of 2 files"));
}

#[test]
fn test_cli_extract_with_dest() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());
    let dest = temp.path().join("output");

    let output = cli_binary().arg(&pak).arg("-d").arg(&dest).output().unwrap();

    assert!(output.status.success());
    assert!(dest.join("hello.txt").exists());
    assert!(dest.join("subdir/nested.txt").exists());
    assert!(!temp.path().join("hello.txt").exists());
}

#[test]
fn test_cli_logs_each_file() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary()
        .arg(&pak)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mkdir"));
    assert!(stderr.contains("extracted"));
    assert!(stderr.contains("nested.txt"));
}

#[test]
fn test_cli_quiet() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary()
        .arg(&pak)
        .arg("-q")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    assert!(temp.path().join("hello.txt").exists());
}

#[test]
fn test_cli_verbose_progress() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary().arg(&pak).arg("-v").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1/2] hello.txt"));
    assert!(stdout.contains("[2/2] subdir/nested.txt"));
}

#[test]
fn test_cli_list() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary().arg(&pak).arg("--list").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello.txt"));
    assert!(stdout.contains("subdir/nested.txt"));
    assert!(stdout.contains("2 entries"));

    // Nothing extracted
    assert!(!temp.path().join("hello.txt").exists());
}

#[test]
fn test_cli_verify() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary().arg(&pak).arg("--verify").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Verified 2 entries"));
    assert!(!temp.path().join("hello.txt").exists());
}

#[test]
fn test_cli_include() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());
    let dest = temp.path().join("out");

    let output = cli_binary()
        .arg(&pak)
        .arg("-d")
        .arg(&dest)
        .arg("--include")
        .arg("subdir/*")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(dest.join("subdir/nested.txt").exists());
    assert!(!dest.join("hello.txt").exists());
}

#[test]
fn test_cli_partial_failure_exit_code() {
    let temp = tempfile::tempdir().unwrap();
    let mut bytes = header(b"PACK", 12, 2 * 64);
    bytes.extend(record(b"../escape.txt", 140, 2));
    bytes.extend(record(b"ok.txt", 140, 2));
    bytes.extend_from_slice(b"ok");
    let pak = write_pak(temp.path(), "bad.pak", &bytes);
    let dest = temp.path().join("out");

    let output = cli_binary().arg(&pak).arg("-d").arg(&dest).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(dest.join("ok.txt").exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Failed 1 entries"));
    assert!(stdout.contains("Path traversal blocked"));
}

#[test]
fn test_cli_bad_magic() {
    let temp = tempfile::tempdir().unwrap();
    let pak = write_pak(temp.path(), "bad.pak", &header(b"BADX", 12, 0));

    let output = cli_binary().arg(&pak).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not a PAK archive"));
}

#[test]
fn test_cli_missing_archive() {
    let temp = tempfile::tempdir().unwrap();

    let output = cli_binary()
        .arg(temp.path().join("nope.pak"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.pak"));
}

#[test]
fn test_cli_rejects_overflowing_size() {
    let temp = tempfile::tempdir().unwrap();
    let pak = create_test_pak(temp.path());

    let output = cli_binary()
        .arg(&pak)
        .arg("--max-size")
        .arg("99999999999G")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Size too large"));
    assert!(!temp.path().join("hello.txt").exists());
}
