//! The import pipeline: validate, back up, apply, and on a fatal failure
//! wipe and replay the backup. Imports are additive: existing records stay
//! in place and colliding ones are resolved per record, so the backup file
//! written up front is the undo point for the whole operation.
//!
//! One invocation walks the phases
//! `VALIDATING -> BACKING_UP -> APPLYING -> {SUCCESS | RESTORING}`;
//! a failed restore is surfaced as a critical outcome naming the backup
//! file and is never swallowed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use super::validator;
use crate::backup;
use crate::export::{self, Snapshot, SNAPSHOT_VERSION};
use crate::schema::Entity;
use crate::state::AppState;
use crate::store::{Store, StoreError};

/// Result of one import invocation, in the shape the UI shell consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Snapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present after a fatal apply error: whether the backup replay put the
    /// previous data back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored: Option<bool>,
    /// Set when the replay itself failed and manual recovery is required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyStats {
    pub created: u64,
    pub skipped_duplicates: u64,
    pub repaired_references: u64,
    pub settings_applied: bool,
}

/// A per-record failure outside the locally recoverable categories. Carries
/// the collection and record index so "sales[5] failed" is unambiguous.
#[derive(Debug, Error)]
pub enum FatalImportError {
    #[error("{entity}[{index}] is not an object")]
    MalformedRecord { entity: &'static str, index: usize },
    #[error("{entity}[{index}]: {source}")]
    Record {
        entity: &'static str,
        index: usize,
        #[source]
        source: StoreError,
    },
    #[error("settings: {source}")]
    Settings {
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("failed to clear {entity}: {source}")]
    Clear {
        entity: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("failed to encode backup snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("replay failed: {0}")]
    Replay(#[from] FatalImportError),
}

/// Run a full import of `raw` (parsed snapshot JSON) against the store.
///
/// The returned outcome is the contract: this function does not return a
/// `Result` because every failure mode (refused, invalid, failed-and-
/// restored, critical) is an outcome the caller must present to the user.
pub async fn import_data(state: &AppState, raw: Value) -> ImportOutcome {
    let store = state.store();

    // Imports are exclusive: the backup file and the bulk-clear step in the
    // restore path are not safe under interleaving.
    let _guard = match state.begin_import() {
        Ok(guard) => guard,
        Err(err) => {
            warn!(target: "shoplite", event = "import_refused", error = %err);
            return ImportOutcome {
                success: false,
                error: Some(err.to_string()),
                ..Default::default()
            };
        }
    };

    info!(target: "shoplite", event = "import_validating");
    if let Err(violations) = validator::validate(&raw).into_result() {
        return ImportOutcome {
            success: false,
            error: Some(format!(
                "snapshot failed validation: {}",
                violations.join("; ")
            )),
            ..Default::default()
        };
    }

    if let Some(version) = raw.get("version").and_then(Value::as_str) {
        if version != SNAPSHOT_VERSION {
            warn!(
                target: "shoplite",
                event = "snapshot_version_mismatch",
                snapshot = %version,
                supported = %SNAPSHOT_VERSION
            );
        }
    }

    info!(target: "shoplite", event = "import_backing_up");
    let (backup_snapshot, backup_path) =
        match backup::create_backup(&store, state.data_dir()).await {
            Ok(pair) => pair,
            Err(err) => {
                // Fail closed: nothing has been mutated yet.
                warn!(target: "shoplite", event = "import_backup_failed", error = %err);
                return ImportOutcome {
                    success: false,
                    error: Some(format!("backup failed, import aborted: {err}")),
                    ..Default::default()
                };
            }
        };

    info!(
        target: "shoplite",
        event = "import_applying",
        backup_path = %backup_path.display()
    );
    match apply_snapshot_value(&store, &raw).await {
        Ok(stats) => success_outcome(&store, stats, &backup_path).await,
        Err(fatal) => restore_after_failure(&store, fatal, backup_snapshot, backup_path).await,
    }
}

async fn success_outcome(store: &Store, stats: ApplyStats, backup_path: &Path) -> ImportOutcome {
    info!(
        target: "shoplite",
        event = "import_succeeded",
        created = stats.created,
        skipped = stats.skipped_duplicates,
        repaired = stats.repaired_references,
        settings_applied = stats.settings_applied
    );
    let data = export::export_snapshot(store).await.ok();
    ImportOutcome {
        success: true,
        data,
        message: Some(format!(
            "Imported {} records ({} duplicates skipped, {} references repaired). Safety backup at {}.",
            stats.created,
            stats.skipped_duplicates,
            stats.repaired_references,
            backup_path.display()
        )),
        backup_path: Some(backup_path.display().to_string()),
        ..Default::default()
    }
}

async fn restore_after_failure(
    store: &Store,
    fatal: FatalImportError,
    backup: Snapshot,
    backup_path: PathBuf,
) -> ImportOutcome {
    warn!(
        target: "shoplite",
        event = "import_restoring",
        error = %fatal,
        backup_path = %backup_path.display()
    );
    match restore_from_snapshot(store, &backup).await {
        Ok(()) => {
            info!(target: "shoplite", event = "import_restored");
            ImportOutcome {
                success: false,
                error: Some(format!("import failed: {fatal}")),
                message: Some(
                    "Import failed; previous data was restored from the safety backup."
                        .to_string(),
                ),
                restored: Some(true),
                backup_path: Some(backup_path.display().to_string()),
                ..Default::default()
            }
        }
        Err(restore_err) => {
            // Unrecoverable here. The log and the outcome both name the
            // backup file so a human can recover manually.
            error!(
                target: "shoplite",
                event = "import_restore_failed",
                error = %restore_err,
                import_error = %fatal,
                backup_path = %backup_path.display()
            );
            ImportOutcome {
                success: false,
                error: Some(format!(
                    "restore from backup failed: {restore_err} (original import error: {fatal})"
                )),
                message: Some(format!(
                    "Critical: the automatic restore failed and the database may be incomplete. Recover manually from the backup at {}.",
                    backup_path.display()
                )),
                restored: Some(false),
                critical: Some(true),
                backup_path: Some(backup_path.display().to_string()),
                ..Default::default()
            }
        }
    }
}

fn collection<'a>(raw: &'a Value, entity: Entity) -> Option<&'a Vec<Value>> {
    raw.get(entity.collection()).and_then(Value::as_array)
}

/// Apply every collection of `raw` in dependency order, settings last.
/// Shared by the forward (APPLYING) and replay (RESTORING) paths so both
/// follow the same per-record recovery rules.
pub(crate) async fn apply_snapshot_value(
    store: &Store,
    raw: &Value,
) -> Result<ApplyStats, FatalImportError> {
    let mut stats = ApplyStats::default();
    for entity in Entity::all() {
        if let Some(records) = collection(raw, entity) {
            for (index, record) in records.iter().enumerate() {
                apply_record(store, entity, index, record, &mut stats).await?;
            }
        }
    }

    // Settings last: a singleton row with no dependents, so a failure here
    // cannot cascade into the collections.
    if let Some(settings) = raw.get("settings").filter(|v| v.is_object()) {
        store
            .update_company_settings(settings)
            .await
            .map_err(|source| FatalImportError::Settings { source })?;
        stats.settings_applied = true;
    }

    Ok(stats)
}

async fn apply_record(
    store: &Store,
    entity: Entity,
    index: usize,
    record: &Value,
    stats: &mut ApplyStats,
) -> Result<(), FatalImportError> {
    let Some(object) = record.as_object() else {
        return Err(FatalImportError::MalformedRecord {
            entity: entity.table(),
            index,
        });
    };

    match store.create(entity, object.clone()).await {
        Ok(_) => {
            stats.created += 1;
            Ok(())
        }
        Err(StoreError::DuplicateKey { detail, .. }) => {
            // Name the record by its natural key when it has one, e.g. the
            // invoice number that already exists.
            let key = entity
                .schema()
                .natural_key
                .and_then(|field| object.get(field))
                .and_then(Value::as_str)
                .unwrap_or("");
            warn!(
                target: "shoplite",
                event = "import_duplicate_skipped",
                entity = %entity,
                index,
                key = %key,
                detail = %detail
            );
            stats.skipped_duplicates += 1;
            Ok(())
        }
        Err(StoreError::ForeignKeyViolation { detail, .. }) => {
            warn!(
                target: "shoplite",
                event = "import_reference_nulled",
                entity = %entity,
                index,
                detail = %detail
            );
            retry_with_nulled_references(store, entity, index, object, stats).await
        }
        Err(source) => Err(FatalImportError::Record {
            entity: entity.table(),
            index,
            source,
        }),
    }
}

/// One retry with the entity's declared reference fields nulled out. The
/// references are soft by contract, so a dangling one degrades to a record
/// without the link rather than failing the import.
async fn retry_with_nulled_references(
    store: &Store,
    entity: Entity,
    index: usize,
    object: &Map<String, Value>,
    stats: &mut ApplyStats,
) -> Result<(), FatalImportError> {
    let mut patched = object.clone();
    for reference in entity.schema().references {
        patched.insert((*reference).to_string(), Value::Null);
    }

    match store.create(entity, patched).await {
        Ok(_) => {
            stats.repaired_references += 1;
            Ok(())
        }
        Err(StoreError::DuplicateKey { detail, .. }) => {
            warn!(
                target: "shoplite",
                event = "import_duplicate_skipped",
                entity = %entity,
                index,
                detail = %detail
            );
            stats.skipped_duplicates += 1;
            Ok(())
        }
        Err(source) => Err(FatalImportError::Record {
            entity: entity.table(),
            index,
            source,
        }),
    }
}

/// Wipe the store and replay the backup snapshot through the normal apply
/// rules. Any failure bubbles out as a `RestoreError` for the caller to
/// escalate.
async fn restore_from_snapshot(store: &Store, backup: &Snapshot) -> Result<(), RestoreError> {
    for entity in Entity::clear_order() {
        store
            .clear(entity)
            .await
            .map_err(|source| RestoreError::Clear {
                entity: entity.table(),
                source,
            })?;
    }
    store
        .clear_company_settings()
        .await
        .map_err(|source| RestoreError::Clear {
            entity: "settings",
            source,
        })?;

    let raw = serde_json::to_value(backup)?;
    apply_snapshot_value(store, &raw).await?;
    Ok(())
}
