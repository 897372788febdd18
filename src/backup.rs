//! Safety snapshots written before destructive imports. Backups live under
//! `<data_dir>/backups/` as timestamped JSON snapshot files. Nothing here
//! deletes a backup: cleanup is a deliberate, manual act, and the overview
//! exists to support it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::available_space;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::db::write_atomic;
use crate::error::{AppError, AppResult};
use crate::export::{self, Snapshot};
use crate::store::Store;

pub const BACKUP_DIR_NAME: &str = "backups";
const SNAPSHOT_PREFIX: &str = "snapshot-";
const REQUIRED_FREE_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub exported_at: String,
    pub version: String,
    pub record_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOverview {
    pub directory: String,
    pub available_bytes: u64,
    pub backups: Vec<BackupEntry>,
}

pub fn backup_root(data_dir: &Path) -> PathBuf {
    data_dir.join(BACKUP_DIR_NAME)
}

/// Export the current store state and persist it under a fresh timestamped
/// file name. Fails without touching the store if the directory cannot be
/// created or disk space is short.
pub async fn create_backup(store: &Store, data_dir: &Path) -> AppResult<(Snapshot, PathBuf)> {
    let root = backup_root(data_dir);
    fs::create_dir_all(&root).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "create_backups_dir")
            .with_context("path", root.display().to_string())
    })?;

    let snapshot = export::export_snapshot(store).await?;
    let payload = export::snapshot_to_bytes(&snapshot)?;

    let required = required_free_bytes(payload.len() as u64);
    let available = free_disk_space(&root)?;
    if available < required {
        return Err(AppError::new(
            "BACKUP/LOW_DISK",
            format!("Not enough disk space (need ~{}).", format_bytes(required)),
        )
        .with_context("available_bytes", available.to_string())
        .with_context("required_bytes", required.to_string()));
    }

    let timestamp = Utc::now();
    let path = unique_snapshot_path(&root, &timestamp)?;
    write_atomic(&path, &payload).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "write_backup")
            .with_context("path", path.display().to_string())
    })?;

    tracing::info!(
        target: "shoplite",
        event = "backup_written",
        path = %path.display(),
        bytes = payload.len()
    );
    Ok((snapshot, path))
}

/// Inventory of the backups directory for manual cleanup. Unreadable files
/// are skipped with a warning rather than failing the listing.
pub fn overview(data_dir: &Path) -> AppResult<BackupOverview> {
    let root = backup_root(data_dir);
    let available = if root.exists() {
        free_disk_space(&root)?
    } else {
        free_disk_space(data_dir)?
    };

    let mut entries = collect_backups(&root)?;
    entries.sort_by(|a, b| b.exported_at.cmp(&a.exported_at));

    Ok(BackupOverview {
        directory: root.to_string_lossy().into_owned(),
        available_bytes: available,
        backups: entries,
    })
}

fn collect_backups(root: &Path) -> AppResult<Vec<BackupEntry>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in fs::read_dir(root).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "read_backups_dir")
            .with_context("path", root.display().to_string())
    })? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(target: "shoplite", error = %err, "skip_invalid_backup_entry");
                continue;
            }
        };
        let path = entry.path();
        let is_snapshot = path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json"))
                .unwrap_or(false);
        if !is_snapshot {
            continue;
        }

        match load_entry(&path) {
            Ok(loaded) => out.push(loaded),
            Err(err) => {
                warn!(
                    target: "shoplite",
                    error = %err,
                    path = %path.display(),
                    "skip_unreadable_backup"
                );
            }
        }
    }

    Ok(out)
}

fn load_entry(path: &Path) -> AppResult<BackupEntry> {
    let bytes = fs::read(path).map_err(AppError::from)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(AppError::from)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(BackupEntry {
        path: path.to_string_lossy().into_owned(),
        size_bytes: bytes.len() as u64,
        sha256: format!("{:x}", hasher.finalize()),
        exported_at: snapshot.exported_at.clone(),
        version: snapshot.version.clone(),
        record_count: snapshot.record_count() as u64,
    })
}

fn unique_snapshot_path(root: &Path, timestamp: &DateTime<Utc>) -> AppResult<PathBuf> {
    let base = timestamp.format("%Y%m%d-%H%M%S").to_string();
    for suffix in 0..100 {
        let name = if suffix == 0 {
            format!("{SNAPSHOT_PREFIX}{base}.json")
        } else {
            format!("{SNAPSHOT_PREFIX}{base}-{suffix:02}.json")
        };
        let candidate = root.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(AppError::new(
        "BACKUP/NAME_COLLISION",
        "Unable to allocate a backup file name",
    ))
}

fn required_free_bytes(payload_len: u64) -> u64 {
    ((payload_len.max(1) as f64) * REQUIRED_FREE_MULTIPLIER).ceil() as u64
}

fn free_disk_space(path: &Path) -> AppResult<u64> {
    if let Ok(fake) = env::var("SHOPLITE_FAKE_FREE_BYTES") {
        if let Ok(value) = fake.parse::<u64>() {
            return Ok(value);
        }
    }

    let target = if path.exists() {
        path
    } else {
        path.parent().unwrap_or(Path::new("/"))
    };
    available_space(target).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "available_space")
            .with_context("path", target.display().to_string())
    })
}

fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 MB".to_string();
    }
    let mb = (bytes as f64) / 1_000_000.0;
    if mb < 1.0 {
        "1 MB".to_string()
    } else {
        format!("{:.0} MB", mb.ceil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_bytes_has_headroom() {
        assert!(required_free_bytes(1_000_000) >= 1_200_000);
        assert!(required_free_bytes(0) > 0);
    }

    #[test]
    fn unique_path_skips_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        let ts = Utc::now();
        let first = unique_snapshot_path(tmp.path(), &ts).unwrap();
        fs::write(&first, b"{}").unwrap();
        let second = unique_snapshot_path(tmp.path(), &ts).unwrap();
        assert_ne!(first, second);
        assert!(second
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("-01.json"));
    }

    #[test]
    fn overview_of_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let info = overview(tmp.path()).unwrap();
        assert!(info.backups.is_empty());
    }
}
