//! Integration tests for the PostgreSQL document store.
//!
//! Skipped unless `DATABASE_URL` points at a database the tests may migrate.

use haulage_db::migration::{Migrator, MigratorTrait};
use haulage_db::{DocumentStore, SeaStore, StoreError, StoredDocument};
use sea_orm::Database;
use serde_json::json;
use uuid::Uuid;

async fn store() -> Option<SeaStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    Some(SeaStore::new(db))
}

fn trip(org: Uuid, code: &str) -> StoredDocument {
    StoredDocument {
        id: Uuid::new_v4(),
        collection: "trips".to_string(),
        organization_id: org,
        code: Some(code.to_string()),
        version: 0,
        disabled: false,
        body: json!({
            "requestId": code,
            "disabled": false,
            "logs": [],
        }),
    }
}

#[tokio::test]
async fn test_insert_find_and_scope() {
    let Some(store) = store().await else { return };
    let org = Uuid::new_v4();

    let doc = store.insert(trip(org, "100001")).await.expect("insert");
    store.insert(trip(org, "100002")).await.expect("insert");

    let found = store
        .find("trips", org, &json!({ "requestId": "100001" }))
        .await
        .expect("find");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, doc.id);

    let all = store.find("trips", org, &json!({})).await.expect("find");
    assert_eq!(all.len(), 2);

    let other = store
        .find_by_id("trips", Uuid::new_v4(), doc.id)
        .await
        .expect("find_by_id");
    assert!(other.is_none());
}

#[tokio::test]
async fn test_duplicate_code_rejected() {
    let Some(store) = store().await else { return };
    let org = Uuid::new_v4();

    store.insert(trip(org, "200001")).await.expect("insert");
    let err = store.insert(trip(org, "200001")).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateCode { .. }));

    store
        .insert(trip(Uuid::new_v4(), "200001"))
        .await
        .expect("same code in another organisation");
}

#[tokio::test]
async fn test_versioned_replace_and_push() {
    let Some(store) = store().await else { return };
    let org = Uuid::new_v4();
    let doc = store.insert(trip(org, "300001")).await.expect("insert");

    let pushed_before = doc.clone();
    store
        .push("trips", org, doc.id, "logs", json!({ "action": "paid" }))
        .await
        .expect("push");

    let err = store.replace(pushed_before, 0).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let current = store
        .find_by_id("trips", org, doc.id)
        .await
        .expect("find_by_id")
        .expect("document exists");
    assert_eq!(current.version, 1);
    assert_eq!(current.body["logs"][0]["action"], "paid");

    let mut next = current.clone();
    next.body["disabled"] = json!(true);
    next.disabled = true;
    let saved = store.replace(next, 1).await.expect("replace");
    assert_eq!(saved.version, 2);

    let live = store
        .count("trips", org, &json!({ "disabled": false }))
        .await
        .expect("count");
    assert_eq!(live, 0);
}

#[tokio::test]
async fn test_remove_is_scoped() {
    let Some(store) = store().await else { return };
    let org = Uuid::new_v4();
    let doc = store.insert(trip(org, "400001")).await.expect("insert");

    let err = store.remove("trips", Uuid::new_v4(), doc.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    store.remove("trips", org, doc.id).await.expect("remove");
    let gone = store.find_by_id("trips", org, doc.id).await.expect("find_by_id");
    assert!(gone.is_none());
}
