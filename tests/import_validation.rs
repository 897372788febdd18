mod util;

use serde_json::json;
use shoplite_lib::{backup, import_data, Entity};
use tempfile::tempdir;
use util::{customer, obj};

#[tokio::test]
async fn malformed_collection_is_rejected_before_any_side_effect() {
    let dir = tempdir().unwrap();
    let state = util::temp_state(dir.path()).await;
    let store = state.store();
    store
        .create(Entity::Customers, obj(customer("Ada")))
        .await
        .unwrap();

    let outcome = import_data(&state, json!({ "sales": "not-an-array" })).await;

    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.contains("sales must be an array"), "{error}");
    assert!(outcome.backup_path.is_none());
    assert!(outcome.restored.is_none());

    // No mutation and no backup file: the gate runs before everything else.
    assert_eq!(store.count(Entity::Customers).await.unwrap(), 1);
    let backups = backup::overview(dir.path()).unwrap();
    assert!(backups.backups.is_empty());
}

#[tokio::test]
async fn non_object_snapshot_is_rejected() {
    let dir = tempdir().unwrap();
    let state = util::temp_state(dir.path()).await;

    let outcome = import_data(&state, json!(42)).await;
    assert!(!outcome.success);
    assert!(outcome
        .error
        .unwrap()
        .contains("snapshot must be a JSON object"));
}

#[tokio::test]
async fn second_import_is_refused_while_one_is_in_flight() {
    let dir = tempdir().unwrap();
    let state = util::temp_state(dir.path()).await;

    let guard = state.begin_import().unwrap();
    let outcome = import_data(&state, json!({})).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("already running"));
    drop(guard);

    let outcome = import_data(&state, json!({})).await;
    assert!(outcome.success, "{:?}", outcome.error);
}
