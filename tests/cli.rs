use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn run_command(cmd: &mut Command) {
    cmd.assert().success();
}

fn write_fixture(workspace: &Path) {
    let images = workspace.join("images");
    fs::create_dir_all(&images).expect("create images dir");
    for name in ["c1.png", "c2.png", "c3.png", "c4.png"] {
        fs::write(images.join(name), name.as_bytes()).expect("write image");
    }
    let manifest = json!({
        "set_type": "train",
        "chips": [
            {"filepath": "images/c1.png", "misc": {"make": "honda", "model": "civic", "color": "red"}},
            {"filepath": "images/c2.png", "misc": {"make": "honda", "model": "civic", "color": "blue"}},
            {"filepath": "images/c3.png", "misc": {"make": "toyota", "model": "camry", "color": "red"}},
            {"filepath": "images/c4.png"}
        ]
    });
    fs::write(
        workspace.join("chips.json"),
        serde_json::to_string_pretty(&manifest).expect("manifest json"),
    )
    .expect("write manifest");
}

#[test]
fn build_then_info_round_trip() {
    let workspace = temp_workspace();
    write_fixture(workspace.path());
    let out = workspace.path().join("keras");
    fs::create_dir_all(&out).expect("create output dir");

    let mut build = Command::cargo_bin("chipclass").expect("binary exists");
    build.current_dir(workspace.path()).args([
        "--quiet",
        "build",
        "chips.json",
        "-o",
        "keras",
        "--no-progress",
    ]);
    run_command(&mut build);

    let root = out.join("train");
    let map_text =
        fs::read_to_string(root.join("class_to_index_map.json")).expect("class map written");
    let map: Value = serde_json::from_str(&map_text).expect("class map is JSON");
    assert_eq!(
        map,
        json!({"None_None": 0, "honda_civic": 1, "toyota_camry": 2})
    );
    assert!(root.join("0").join("c4.png").is_file());
    assert!(root.join("1").join("c1.png").is_file());
    assert!(root.join("1").join("c2.png").is_file());
    assert!(root.join("2").join("c3.png").is_file());

    let mut info = Command::cargo_bin("chipclass").expect("binary exists");
    let info_output = info
        .current_dir(workspace.path())
        .args(["--quiet", "info", "keras/train", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&info_output).expect("info output is JSON");
    assert_eq!(summary["total_files"], json!(4));
    assert_eq!(summary["classes"][1]["files"], json!(2));
    assert_eq!(summary["unexpected_dirs"], json!([]));
}

#[test]
fn build_without_root_and_with_color_key() {
    let workspace = temp_workspace();
    write_fixture(workspace.path());
    fs::create_dir_all(workspace.path().join("out")).expect("create output dir");

    let mut build = Command::cargo_bin("chipclass").expect("binary exists");
    build.current_dir(workspace.path()).args([
        "--quiet",
        "build",
        "chips.json",
        "-o",
        "out",
        "--key",
        "color",
        "--no-root",
        "--no-map",
        "--no-progress",
    ]);
    run_command(&mut build);

    let out = workspace.path().join("out");
    assert!(out.join("2").join("c1.png").is_file());
    assert!(out.join("2").join("c3.png").is_file());
    assert!(out.join("1").join("c2.png").is_file());
    assert!(out.join("0").join("c4.png").is_file());
    assert!(!out.join("class_to_index_map.json").exists());
    assert!(!out.join("train").exists());
}

#[test]
fn build_fails_on_second_run_and_strict_mode() {
    let workspace = temp_workspace();
    write_fixture(workspace.path());
    fs::create_dir_all(workspace.path().join("out")).expect("create output dir");

    let args = ["--quiet", "build", "chips.json", "-o", "out", "--no-progress"];
    let mut first = Command::cargo_bin("chipclass").expect("binary exists");
    first.current_dir(workspace.path()).args(args);
    run_command(&mut first);

    let mut second = Command::cargo_bin("chipclass").expect("binary exists");
    second
        .current_dir(workspace.path())
        .args(args)
        .assert()
        .failure();

    let mut strict = Command::cargo_bin("chipclass").expect("binary exists");
    strict
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "build",
            "chips.json",
            "-o",
            "out",
            "--root",
            "strict",
            "--strict",
            "--no-progress",
        ])
        .assert()
        .failure();
    assert!(!workspace.path().join("out").join("strict").exists());
}

#[test]
fn classes_prints_sorted_map() {
    let workspace = temp_workspace();
    write_fixture(workspace.path());

    let mut classes = Command::cargo_bin("chipclass").expect("binary exists");
    let output = classes
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "classes",
            "chips.json",
            "--key-field",
            "color",
            "--key-field",
            "make",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let map: Value = serde_json::from_slice(&output).expect("classes output is JSON");
    assert_eq!(
        map,
        json!({"None_None": 0, "blue_honda": 1, "red_honda": 2, "red_toyota": 3})
    );
}
