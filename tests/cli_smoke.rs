use std::fs;

use anyhow::Result;
use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn export_import_backups_flow() -> Result<()> {
    let tmp = tempdir()?;
    let data_dir = tmp.path().join("appdata");
    let out_path = tmp.path().join("export.json");

    let output = Command::cargo_bin("shoplite")?
        .env("SHOPLITE_DATA_DIR", &data_dir)
        .args(["data", "export", "--json"])
        .arg("--out")
        .arg(&out_path)
        .output()?;
    assert!(
        output.status.success(),
        "export failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
    assert_eq!(
        exported.get("version").and_then(|v| v.as_str()),
        Some(shoplite_lib::SNAPSHOT_VERSION)
    );
    assert!(exported.get("exportedAt").is_some());

    let output = Command::cargo_bin("shoplite")?
        .env("SHOPLITE_DATA_DIR", &data_dir)
        .args(["data", "import", "--json"])
        .arg(&out_path)
        .output()?;
    assert!(
        output.status.success(),
        "import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(outcome.get("success"), Some(&serde_json::Value::Bool(true)));
    assert!(outcome.get("backupPath").is_some());

    let output = Command::cargo_bin("shoplite")?
        .env("SHOPLITE_DATA_DIR", &data_dir)
        .args(["data", "backups", "--json"])
        .output()?;
    assert!(output.status.success());
    let overview: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        overview
            .get("backups")
            .and_then(|b| b.as_array())
            .map(|b| b.len()),
        Some(1)
    );

    Ok(())
}

#[test]
fn import_of_invalid_snapshot_exits_nonzero() -> Result<()> {
    let tmp = tempdir()?;
    let data_dir = tmp.path().join("appdata");
    let bad_path = tmp.path().join("bad.json");
    fs::write(&bad_path, r#"{ "sales": "not-an-array" }"#)?;

    let output = Command::cargo_bin("shoplite")?
        .env("SHOPLITE_DATA_DIR", &data_dir)
        .args(["data", "import"])
        .arg(&bad_path)
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("sales must be an array"));

    Ok(())
}
