mod util;

use std::path::Path;

use serde_json::json;
use shoplite_lib::{backup, export_snapshot, import_data, Entity};
use tempfile::tempdir;
use util::{customer, obj, product, sale};

fn backup_files(data_dir: &Path) -> Vec<String> {
    backup::overview(data_dir)
        .unwrap()
        .backups
        .into_iter()
        .map(|entry| entry.path)
        .collect()
}

#[tokio::test]
async fn successful_import_retains_the_backup_as_an_undo_point() {
    let dir = tempdir().unwrap();
    let state = util::temp_state(dir.path()).await;

    let outcome = import_data(&state, json!({ "customers": [customer("Ada")] })).await;
    assert!(outcome.success, "{:?}", outcome.error);

    let backup_path = outcome.backup_path.unwrap();
    assert!(Path::new(&backup_path).is_file());
    assert_eq!(backup_files(dir.path()), vec![backup_path]);
}

#[tokio::test]
async fn fatal_apply_error_restores_the_pre_import_state() {
    let dir = tempdir().unwrap();
    let state = util::temp_state(dir.path()).await;
    let store = state.store();

    for name in ["Ada", "Bob"] {
        store
            .create(Entity::Customers, obj(customer(name)))
            .await
            .unwrap();
    }
    store
        .create(Entity::Products, obj(product("Widget", 9.99)))
        .await
        .unwrap();
    let before = export_snapshot(&store).await.unwrap();

    // products[1] violates the price check, which is outside the locally
    // recoverable categories and must abort the whole import.
    let outcome = import_data(
        &state,
        json!({
            "customers": [customer("Carol")],
            "products": [product("Gadget", 4.5), product("Broken", -1.0)],
        }),
    )
    .await;

    assert!(!outcome.success);
    assert_eq!(outcome.restored, Some(true));
    assert_ne!(outcome.critical, Some(true));
    let error = outcome.error.unwrap();
    assert!(error.contains("products[1]"), "{error}");
    let backup_path = outcome.backup_path.unwrap();
    assert!(Path::new(&backup_path).is_file());

    // Not a half-imported state: the store matches the pre-import snapshot.
    let after = export_snapshot(&store).await.unwrap();
    let strip = |snapshot: &shoplite_lib::Snapshot| {
        let mut value = serde_json::to_value(snapshot).unwrap();
        let map = value.as_object_mut().unwrap();
        map.remove("exportedAt");
        for collection in map.values_mut() {
            if let Some(records) = collection.as_array_mut() {
                for record in records {
                    record.as_object_mut().unwrap().remove("updatedAt");
                }
            }
        }
        value
    };
    assert_eq!(strip(&before), strip(&after));
    assert_eq!(store.count(Entity::Customers).await.unwrap(), 2);
    assert_eq!(store.count(Entity::Products).await.unwrap(), 1);
}

#[tokio::test]
async fn failed_restore_is_surfaced_as_critical_with_the_backup_path() {
    let dir = tempdir().unwrap();
    let state = util::temp_state(dir.path()).await;
    let store = state.store();

    // Plant a row that exports fine but cannot be re-inserted: the backup
    // replay will trip the price check and fail.
    sqlx::query("PRAGMA ignore_check_constraints = ON")
        .execute(state.pool())
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO products (id, name, price, stock, created_at, updated_at)\n         VALUES ('poison', 'Poison', -1.0, 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
    )
    .execute(state.pool())
    .await
    .unwrap();
    sqlx::query("PRAGMA ignore_check_constraints = OFF")
        .execute(state.pool())
        .await
        .unwrap();

    // The import itself dies on an invalid sale status.
    let mut bad_sale = obj(sale(None));
    bad_sale.insert("status".into(), json!("bogus"));
    let outcome = import_data(&state, json!({ "sales": [bad_sale] })).await;

    assert!(!outcome.success);
    assert_eq!(outcome.critical, Some(true));
    assert_eq!(outcome.restored, Some(false));
    let backup_path = outcome.backup_path.expect("critical outcome names the backup");
    assert!(!backup_path.is_empty());
    assert!(Path::new(&backup_path).is_file());
    let error = outcome.error.unwrap();
    assert!(error.contains("restore from backup failed"), "{error}");

    // The store is left in whatever partial state the failed replay
    // produced; nothing pretends the restore worked.
    assert_eq!(store.count(Entity::Products).await.unwrap(), 0);
}
