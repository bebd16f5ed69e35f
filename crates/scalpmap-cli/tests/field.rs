use assert_cmd::cargo::cargo_bin_cmd;
use std::{fs, path::PathBuf};
use tempfile::tempdir;

#[test]
fn render_field_writes_a_deterministic_png() {
    let electrodes = sample_path("test_data/electrodes_sample.json");
    let dir = tempdir().unwrap();
    let first = dir.path().join("field_a.png");
    let second = dir.path().join("field_b.png");

    for out in [&first, &second] {
        let mut cmd = cargo_bin_cmd!("scalpmap");
        cmd.args([
            "render-field",
            "--input",
            &electrodes,
            "--out",
            out.to_str().unwrap(),
        ]);
        cmd.assert().success();
    }

    let a = fs::read(&first).unwrap();
    let b = fs::read(&second).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b, "identical input must produce identical rasters");
}

#[test]
fn export_summary_writes_one_row_per_electrode() {
    let electrodes = sample_path("test_data/electrodes_sample.json");
    let dir = tempdir().unwrap();
    let out = dir.path().join("summary.csv");

    let mut cmd = cargo_bin_cmd!("scalpmap");
    cmd.args([
        "export-summary",
        "--input",
        &electrodes,
        "--out",
        out.to_str().unwrap(),
    ]);
    cmd.assert().success();

    let contents = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    // Header plus the six fixture electrodes.
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("name,region,kind"));
    assert!(contents.contains("PO3,Pariétal,interpolated"));
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("crates dir")
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

fn sample_path(relative: &str) -> String {
    workspace_root()
        .join(relative)
        .to_string_lossy()
        .to_string()
}
