//! Snapshot assembly and snapshot files. A snapshot captures every entity
//! collection plus the settings row, tagged with a format version and an
//! export timestamp. Assembly is all-or-nothing: if any collection read
//! fails the whole export fails rather than producing a partial snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::write_atomic;
use crate::error::{AppError, AppResult};
use crate::schema::Entity;
use crate::store::{CompanySettings, Store};
use crate::time::now_iso;

pub const SNAPSHOT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoices: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<CompanySettings>,
    pub exported_at: String,
    pub version: String,
}

impl Snapshot {
    pub fn collection(&self, entity: Entity) -> Option<&[Value]> {
        let slot = match entity {
            Entity::Customers => &self.customers,
            Entity::Products => &self.products,
            Entity::Sales => &self.sales,
            Entity::Invoices => &self.invoices,
            Entity::Orders => &self.orders,
            Entity::Returns => &self.returns,
        };
        slot.as_deref()
    }

    pub fn record_count(&self) -> usize {
        Entity::all()
            .filter_map(|entity| self.collection(entity))
            .map(|records| records.len())
            .sum()
    }
}

/// Read every collection and the settings row into a fresh snapshot.
pub async fn export_snapshot(store: &Store) -> AppResult<Snapshot> {
    let mut collections: Vec<Vec<Value>> = Vec::with_capacity(Entity::APPLY_ORDER.len());
    for entity in Entity::all() {
        let records = store.list(entity).await.map_err(|err| {
            AppError::from(err)
                .with_context("operation", "export_collection")
                .with_context("entity", entity.table())
        })?;
        collections.push(records);
    }
    let settings = store
        .company_settings()
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "export_settings"))?;

    let mut iter = collections.into_iter();
    Ok(Snapshot {
        customers: iter.next(),
        products: iter.next(),
        sales: iter.next(),
        invoices: iter.next(),
        orders: iter.next(),
        returns: iter.next(),
        settings: Some(settings),
        exported_at: now_iso(),
        version: SNAPSHOT_VERSION.to_string(),
    })
}

/// Serialize a snapshot to pretty JSON, matching the files the desktop app
/// exchanges with users.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> AppResult<Vec<u8>> {
    serde_json::to_vec_pretty(snapshot)
        .map_err(|err| AppError::from(err).with_context("operation", "serialize_snapshot"))
}

/// Write a snapshot file atomically.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> AppResult<()> {
    let payload = snapshot_to_bytes(snapshot)?;
    write_atomic(path, &payload).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "write_snapshot")
            .with_context("path", path.display().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_collections_deserialize_as_none() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "customers": [],
            "exportedAt": "2026-01-12T00:00:00Z",
            "version": "1.0.0",
        }))
        .unwrap();
        assert_eq!(snapshot.collection(Entity::Customers), Some(&[][..]));
        assert!(snapshot.collection(Entity::Sales).is_none());
        assert!(snapshot.settings.is_none());
        assert_eq!(snapshot.record_count(), 0);
    }

    #[test]
    fn unknown_top_level_fields_are_ignored() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "preferences": { "darkMode": true },
            "exportedAt": "2026-01-12T00:00:00Z",
            "version": "1.0.0",
        }))
        .unwrap();
        assert!(snapshot.customers.is_none());
    }
}
