use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nuget-config"))
}

/// Get the path to the fixtures directory
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Copy the fixture config into a scratch directory so tests can write to it
fn scratch_config(dir: &Path) -> PathBuf {
    let path = dir.join("NuGet.Config");
    fs::copy(fixtures_dir().join("NuGet.Config"), &path).unwrap();
    path
}

fn run(args: &[&OsStr]) -> std::process::Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

#[test]
fn test_batch_reports_applied_edits() {
    let dir = tempfile::tempdir().unwrap();
    let config = scratch_config(dir.path());
    let original = fs::read(&config).unwrap();

    let output = run(&[
        OsStr::new("--file"),
        config.as_os_str(),
        OsStr::new("--edits"),
        fixtures_dir().join("edits.json").as_os_str(),
    ]);

    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Applied 2 edit(s)"), "Unexpected output: {}", stdout);
    assert!(stdout.contains(&format!("Original checksum: {}", blake3::hash(&original).to_hex())));

    // no destination given, so the file is left alone
    assert_eq!(fs::read(&config).unwrap(), original);
}

#[test]
fn test_in_place_edit_is_surgical() {
    let dir = tempfile::tempdir().unwrap();
    let config = scratch_config(dir.path());
    let original = fs::read_to_string(&config).unwrap();

    let output = run(&[
        OsStr::new("--file"),
        config.as_os_str(),
        OsStr::new("--edits"),
        fixtures_dir().join("edits.json").as_os_str(),
        OsStr::new("--in-place"),
    ]);
    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));

    let expected = original
        .replace(r#"value="./packages""#, r#"value="./artifacts""#)
        .replace(
            "  </packageSources>",
            "    <add key=\"ci-feed\" value=\"https://ci.example.com/v3/index.json\" protocolVersion=\"3\" />\n  </packageSources>",
        );
    assert_eq!(fs::read_to_string(&config).unwrap(), expected);
}

#[test]
fn test_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = scratch_config(dir.path());
    let out_file = dir.path().join("edited.config");

    let output = run(&[
        OsStr::new("--file"),
        config.as_os_str(),
        OsStr::new("--edits"),
        fixtures_dir().join("edits.json").as_os_str(),
        OsStr::new("--output"),
        out_file.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    let written = fs::read(&out_file).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["execution_id"], "fixture-run");
    assert_eq!(json["applied_count"], 2);
    assert_eq!(json["final_checksum"], blake3::hash(&written).to_hex().as_str());
    assert_eq!(
        json["total_byte_shift"].as_i64().unwrap(),
        written.len() as i64 - fs::metadata(&config).unwrap().len() as i64
    );
}

#[test]
fn test_conflicting_batch_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let config = scratch_config(dir.path());
    let original = fs::read(&config).unwrap();

    let output = run(&[
        OsStr::new("--file"),
        config.as_os_str(),
        OsStr::new("--edits"),
        fixtures_dir().join("edits_conflict.json").as_os_str(),
        OsStr::new("--in-place"),
        OsStr::new("--json"),
    ]);

    assert!(!output.status.success(), "Binary should have failed with a conflict");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error_kind"], "conflict");
    assert_eq!(fs::read(&config).unwrap(), original);
}

#[test]
fn test_missing_source_reports_not_found() {
    let output = run(&[
        OsStr::new("--file"),
        fixtures_dir().join("NuGet.Config").as_os_str(),
        OsStr::new("--edits"),
        fixtures_dir().join("edits_missing_source.json").as_os_str(),
    ]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Error (not_found)"), "Unexpected output: {}", stdout);
    assert!(stdout.contains("does-not-exist"));
}

#[test]
fn test_checksum_mismatch() {
    let output = run(&[
        OsStr::new("--file"),
        fixtures_dir().join("NuGet.Config").as_os_str(),
        OsStr::new("--edits"),
        fixtures_dir().join("edits_wrong_checksum.json").as_os_str(),
    ]);

    assert!(!output.status.success(), "Binary should have failed with checksum mismatch");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("checksum mismatch"), "Expected checksum error, got: {}", stdout);
}

#[test]
fn test_stdin_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = scratch_config(dir.path());

    let mut child = Command::new(bin_path())
        .arg("--file")
        .arg(&config)
        .arg("--in-place")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to execute binary");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"operations": [{"op": "remove_source", "key": "local"}]}"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let edited = fs::read_to_string(&config).unwrap();
    assert!(!edited.contains(r#"<add key="local" value="./packages" />"#));
    // the disabled entry is a separate section and stays
    assert!(edited.contains(r#"<add key="local" value="true" />"#));
}

#[test]
fn test_discovers_config_from_working_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("src");
    fs::create_dir(&nested).unwrap();
    fs::copy(fixtures_dir().join("NuGet.Config"), dir.path().join("nuget.config")).unwrap();

    let output = Command::new(bin_path())
        .arg("--show")
        .current_dir(&nested)
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nuget.org = https://api.nuget.org/v3/index.json [v3]"));
    assert!(stdout.contains("local = ./packages (disabled)"));
}

#[test]
fn test_show_json() {
    let output = run(&[
        OsStr::new("--file"),
        fixtures_dir().join("NuGet.Config").as_os_str(),
        OsStr::new("--show"),
        OsStr::new("--json"),
    ]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["clear_sources"], true);
    assert_eq!(json["package_sources"][0]["key"], "nuget.org");
    assert_eq!(json["package_sources"][0]["protocol_version"], "3");
    assert_eq!(json["disabled_sources"][0]["key"], "local");
}
