//! End-to-end tests that spawn the `asbuilt` binary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn asbuilt() -> Command {
    Command::new(env!("CARGO_BIN_EXE_asbuilt"))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn write_slab(dir: &Path, file: &str, x: (f64, f64), y: (f64, f64), z: (f64, f64)) {
    let mut text = String::new();
    for i in 0..=4 {
        for j in 0..=4 {
            for k in 0..=2 {
                let px = x.0 + (x.1 - x.0) * i as f64 / 4.0;
                let py = y.0 + (y.1 - y.0) * j as f64 / 4.0;
                let pz = z.0 + (z.1 - z.0) * k as f64 / 2.0;
                writeln!(text, "{px} {py} {pz}").unwrap();
            }
        }
    }
    std::fs::write(dir.join(file), text).unwrap();
}

/// Temp workspace: config and model copied in, one matching wall, one new
/// wall, the west wall left unscanned.
fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("site.toml"), dir.path().join("site.toml")).unwrap();
    std::fs::copy(fixture("model.json"), dir.path().join("model.json")).unwrap();
    let scans = dir.path().join("scans");
    std::fs::create_dir(&scans).unwrap();
    write_slab(&scans, "wall1.txt", (0.0, 8.0), (-0.1, 0.1), (0.0, 3.0));
    write_slab(&scans, "wall2.txt", (0.0, 5.0), (9.9, 10.1), (0.0, 3.0));
    dir
}

fn run_args<'a>(cmd: &'a mut Command, dir: &Path, sub: &str) -> &'a mut Command {
    cmd.arg(sub)
        .arg(dir.join("site.toml"))
        .arg("--scans")
        .arg(dir.join("scans"))
        .arg("--model")
        .arg(dir.join("model.json"))
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn validate_accepts_fixture_config() {
    let out = asbuilt().arg("validate").arg(fixture("site.toml")).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("site: valid"));
}

#[test]
fn validate_rejects_short_sweep_bound() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "name = \"bad\"\n[synthesis]\nmin_sweeps = 2\n").unwrap();
    let out = asbuilt().arg("validate").arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("min_sweeps"), "{}", stderr(&out));
}

// ============================================================================
// check
// ============================================================================

#[test]
fn check_prints_json_and_leaves_model_alone() {
    let dir = workspace();
    let before = std::fs::read_to_string(dir.path().join("model.json")).unwrap();

    let out = run_args(&mut asbuilt(), dir.path(), "check").arg("--json").output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["meta"]["applied"], false);
    assert_eq!(result["summary"]["delete"], 1);
    assert_eq!(result["summary"]["create"], 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("model.json")).unwrap(), before);

    // [output] report resolves next to the config.
    let report = std::fs::read_to_string(dir.path().join("report.csv")).unwrap();
    assert!(report.lines().any(|l| l.starts_with("scan,wall2,wall2,wall,create,pending,no match")));
}

#[test]
fn check_fails_on_drift_when_asked() {
    let dir = workspace();
    let out = run_args(&mut asbuilt(), dir.path(), "check").arg("--fail-on-drift").output().unwrap();
    assert_eq!(out.status.code(), Some(7));
    assert!(stderr(&out).contains("model differs from scans"));
}

#[test]
fn region_mode_without_region_is_usage_error() {
    let dir = workspace();
    std::fs::write(dir.path().join("site.toml"), "name = \"roi\"\nmode = \"region_of_interest\"\n").unwrap();
    let out = run_args(&mut asbuilt(), dir.path(), "check").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("hint:  pass --region"), "{}", stderr(&out));
}

#[test]
fn missing_scan_directory_is_io_error() {
    let dir = workspace();
    std::fs::remove_dir_all(dir.path().join("scans")).unwrap();
    let out = run_args(&mut asbuilt(), dir.path(), "check").output().unwrap();
    assert_eq!(out.status.code(), Some(4));
}

// ============================================================================
// update
// ============================================================================

#[test]
fn update_saves_generated_model() {
    let dir = workspace();
    let out_dir = dir.path().join("out");
    let out = run_args(&mut asbuilt(), dir.path(), "update")
        .arg("--model-dir")
        .arg(&out_dir)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let saved: Vec<PathBuf> = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 1);
    let name = saved[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("updated_model_"), "{name}");

    let model: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&saved[0]).unwrap()).unwrap();
    let ids: Vec<&str> = model["elements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"w_south"));
    assert!(!ids.contains(&"w_west"));
    assert!(stderr(&out).contains("1 created"), "{}", stderr(&out));
}

// ============================================================================
// region
// ============================================================================

#[test]
fn region_prints_hull_json() {
    let dir = tempfile::tempdir().unwrap();
    write_slab(dir.path(), "region.txt", (0.0, 6.0), (0.0, 4.0), (0.3, 3.3));
    let out = asbuilt().arg("region").arg(dir.path().join("region.txt")).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let region: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(region["hull"]["vertices"].as_array().unwrap().len() >= 3);
    // Band is shifted down by the default 0.3 offset.
    assert!(region["z_min"].as_f64().unwrap().abs() < 1e-9);
    assert!((region["z_max"].as_f64().unwrap() - 3.0).abs() < 1e-9);
}
