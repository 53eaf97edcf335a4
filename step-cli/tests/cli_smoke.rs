//! # 命令行冒烟测试
//!
//! 直接运行 `stepdraw` 二进制，播放仓库自带的演示脚本。

use std::path::PathBuf;
use std::process::Command;

fn demo() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/triangle.json")
}

fn stepdraw() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stepdraw"))
}

#[test]
fn test_check_demo_passes() {
    let output = stepdraw().arg("check").arg(demo()).output().unwrap();
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn test_play_prints_trace() {
    let output = stepdraw()
        .args(["play", "--steps", "2"])
        .arg(demo())
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("point(0,0):animate"));
    assert!(stdout.contains("label(A):end_state"));
    assert!(stdout.contains("line(4,0):animate"));
    assert!(!stdout.contains("vector"));
}

#[test]
fn test_goto_json_trace() {
    let output = stepdraw()
        .args(["goto", "--json"])
        .arg(demo())
        .arg("3")
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let trace: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(trace.contains(&"point(0,0):end_state".to_string()));
    assert!(trace.contains(&"viewport:zoom_in:animate".to_string()));
    assert!(trace.contains(&"text(u+v=w):write".to_string()));
    assert!(!trace.iter().any(|e| e == "point(0,0):animate"));
}

#[test]
fn test_check_rejects_broken_script() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{"title":"broken","steps":[{"commands":[{"op":"focus","keep":["ghost"]}]}]}"#,
    )
    .unwrap();

    let output = stepdraw().arg("check").arg(&path).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ghost"));
}
