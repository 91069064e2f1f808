//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `nako` binary and verify exit codes,
//! stdout content, and stderr content. Fixtures live in temporary
//! directories, which are also used as the working directory so no stray
//! `nako.toml` is picked up.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn nako(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("nako");
    cmd.current_dir(dir);
    cmd
}

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).expect("write fixture");
    path
}

const CLEAN: &str = "\
●(AとBを)合計とは
  AとBを足す
ここまで
3と4を合計
";

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    nako(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nadesiko3 source analysis toolchain"));
}

#[test]
fn version_exits_0() {
    let dir = TempDir::new().unwrap();
    nako(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nako"));
}

// ──────────────────────────────────────────────
// 2. check
// ──────────────────────────────────────────────

#[test]
fn check_clean_file_exits_0() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", CLEAN);
    nako(dir.path())
        .args(["check"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 problem(s) in 1 file(s)"));
}

#[test]
fn check_reports_unclosed_block_and_exits_1() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "もしAが1ならば\n  「x」を表示\n");
    nako(dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[noCloseStatement]"))
        .stdout(predicate::str::contains("1:1: ERROR"));
}

#[test]
fn check_warnings_alone_exit_0() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "定数Xは1\nXは2\n");
    nako(dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("[assignToConst]"));
}

#[test]
fn check_json_output() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "@@@\n");
    let out = nako(dir.path())
        .args(["--output", "json", "check"])
        .arg(&file)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    let diagnostics = json[0]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 3);
    assert_eq!(diagnostics[0]["message_id"], "invalidChar");
    assert_eq!(diagnostics[0]["level"], "ERROR");
}

#[test]
fn check_problems_limit_flag_caps_output() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "@@@@@@\n");
    nako(dir.path())
        .args(["--problems-limit", "2", "check"])
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("4 more problem(s) not shown"));
}

#[test]
fn check_follows_imports() {
    let dir = TempDir::new().unwrap();
    write(&dir, "lib.nako3", "●(Aを)二倍とは\n  Aと2を掛ける\nここまで\n");
    let main = write(&dir, "main.nako3", "!「lib.nako3」を取り込む\n3を二倍\n");
    let out = nako(dir.path())
        .args(["--output", "json", "check"])
        .arg(&main)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json[0]["imports"], 1);
    assert_eq!(json[0]["imports_complete"], true);
}

#[test]
fn check_missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    nako(dir.path())
        .args(["check", "nope.nako3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn quiet_suppresses_output() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "@\n");
    nako(dir.path())
        .args(["--quiet", "check"])
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = TempDir::new().unwrap();
    write(&dir, "nako.toml", "[analyzer]\nhint_unmatched_josi = false\n");
    let file = write(&dir, "main.nako3", "●(Aを)処理とは\nここまで\n1で処理\n");
    nako(dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("josiNotMatched").not());
}

#[test]
fn malformed_config_exits_2() {
    let dir = TempDir::new().unwrap();
    write(&dir, "nako.toml", "[analyzer\n");
    let file = write(&dir, "main.nako3", CLEAN);
    nako(dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid configuration"));
}

// ──────────────────────────────────────────────
// 3. tokens and decls
// ──────────────────────────────────────────────

#[test]
fn tokens_lists_particles() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "「こんにちは」を表示\n");
    nako(dir.path())
        .arg("tokens")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("josi=を"))
        .stdout(predicate::str::contains("call args=1"));
}

#[test]
fn tokens_json_is_an_array_ending_in_eof() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", "Aは1\n");
    let out = nako(dir.path())
        .args(["--output", "json", "tokens"])
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let tokens = json.as_array().unwrap();
    assert_eq!(tokens.last().unwrap()["kind"], "Eof");
}

#[test]
fn decls_lists_functions_and_parameters() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "main.nako3", CLEAN);
    nako(dir.path())
        .arg("decls")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("合計\tfunc(Aと Bを)\tglobal/public"))
        .stdout(predicate::str::contains("A\tparameter\tscope 1"));
}

// ──────────────────────────────────────────────
// 4. catalog
// ──────────────────────────────────────────────

#[test]
fn catalog_validate_accepts_allow_listed_empty_group() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "plugin.json",
        r#"{"system": {"予約語": {}, "基本": {"表示": {"type": "func"}}}}"#,
    );
    nako(dir.path())
        .args(["catalog", "validate"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn catalog_validate_rejects_empty_group() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "plugin.json", r#"{"plugin_x": {"空": {}}}"#);
    nako(dir.path())
        .args(["catalog", "validate"])
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("group '空' of plugin 'plugin_x' has no command"));
}

#[test]
fn catalog_validate_rejects_bad_json() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "plugin.json", "{not json");
    nako(dir.path())
        .args(["catalog", "validate"])
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid declaration catalog"));
}

#[test]
fn catalog_export_round_trips_through_validate() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "lib.nako3", "●(Aを)二倍とは\nここまで\n定数PIは3\n");
    let out = nako(dir.path())
        .args(["catalog", "export"])
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["lib"]["関数"]["二倍"]["type"], "func");
    assert_eq!(json["lib"]["関数"]["二倍"]["args"][0]["josi"][0], "を");
    assert_eq!(json["lib"]["定数"]["PI"]["type"], "const");

    let exported = dir.path().join("lib.json");
    fs::write(&exported, &out).unwrap();
    nako(dir.path())
        .args(["catalog", "validate"])
        .arg(&exported)
        .assert()
        .success();
}

#[test]
fn catalog_system_prints_builtin_commands() {
    let dir = TempDir::new().unwrap();
    nako(dir.path())
        .args(["catalog", "system"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"表示\""));
}
