use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../discovery/tests/fixtures")
        .join(name)
}

/// Copies the fixture documents under `root/build` and writes a config next
/// to them with both oracles switched off.
fn write_config(root: &Path) -> PathBuf {
    let build = root.join("build");
    fs::create_dir_all(&build).unwrap();
    for name in ["module_msg.json", "plugin_msg.json", "introspection.json"] {
        fs::copy(fixture(name), build.join(name)).unwrap();
    }
    let yaml = r#"version: "1.0"
root: .
introspection: build/introspection.json
catalogs:
  - source_dir: protobuf
    doc: build/module_msg.json
  - source_dir: plugins/sample/protobuf
    doc: build/plugin_msg.json
images:
  - core/bessd
sample_dirs:
  - bessctl/conf
output_dir: build/modcat
"#;
    let path = root.join("modcat.yml");
    fs::write(&path, yaml).unwrap();
    path
}

fn modcat(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modcat"))
        .args(args)
        .output()
        .expect("failed to run modcat")
}

fn run_offline(config: &Path, extra: &[&str]) -> Output {
    let mut args = vec![
        "run",
        "--config",
        config.to_str().unwrap(),
        "--no-locations",
        "--no-examples",
    ];
    args.extend_from_slice(extra);
    modcat(&args)
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_all_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = run_offline(&config, &[]);
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("stage 0 (link): 6 modules"), "stdout: {stdout}");
    assert!(stdout.contains("stage 2 (compact)"));

    let out = dir.path().join("build/modcat");
    for file in ["combined.json", "pruned.json", "compact.json.gz", "manifest.json"] {
        assert!(out.join(file).exists(), "{file} should exist");
    }

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["runtime_version"], "0.4.0-dev");
    assert_eq!(manifest["stages"]["prune"]["file"], "pruned.json");
    assert_eq!(manifest["stages"]["compact"]["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn run_resumes_from_prune() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert!(run_offline(&config, &[]).status.success());

    let output = run_offline(&config, &["--from-stage", "1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("stage 0"));
    assert!(stdout.contains("stage 1 (prune)"));
}

#[test]
fn run_rejects_tampered_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert!(run_offline(&config, &[]).status.success());

    let pruned = dir.path().join("build/modcat/pruned.json");
    let mut text = fs::read_to_string(&pruned).unwrap();
    text.push(' ');
    fs::write(&pruned, text).unwrap();

    let output = run_offline(&config, &["--from-stage", "2"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid checksum"));
}

#[test]
fn run_from_stage_without_checkpoint_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = run_offline(&config, &["--from-stage", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing checkpoint"));
}

// ---------------------------------------------------------------------------
// expand / validate
// ---------------------------------------------------------------------------

#[test]
fn expand_restores_file_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert!(run_offline(&config, &[]).status.success());

    let compact = dir.path().join("build/modcat/compact.json.gz");
    let expanded_path = dir.path().join("expanded.json");
    let output = modcat(&[
        "expand",
        compact.to_str().unwrap(),
        "--output",
        expanded_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let expanded: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&expanded_path).unwrap()).unwrap();
    assert_eq!(
        expanded["types"]["bess.pb.DRRArg"]["file"],
        "protobuf/module_msg.proto"
    );
    assert_eq!(
        expanded["types"]["sample.plugin.SampleArg"]["file"],
        "plugins/sample/protobuf/sample_msg.proto"
    );
    assert!(expanded["types"]["bess.pb.DRRArg"].get("dep").is_none());
}

#[test]
fn validate_reports_dangling_references() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert!(run_offline(&config, &[]).status.success());

    let pruned = dir.path().join("build/modcat/pruned.json");
    let output = modcat(&["validate", pruned.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok"));

    let mut artifact: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&pruned).unwrap()).unwrap();
    artifact["types"]
        .as_object_mut()
        .unwrap()
        .remove("bess.pb.DRRArg");
    let broken = dir.path().join("broken.json");
    fs::write(&broken, serde_json::to_string(&artifact).unwrap()).unwrap();

    let output = modcat(&["validate", broken.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("bess.pb.DRRArg"));
}
