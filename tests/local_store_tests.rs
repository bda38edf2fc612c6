mod common;

use catalog_sync::models::target::{codes, find_target};
use catalog_sync::storage::{CatalogStore, LocalStorage};
use catalog_sync::{rebuild_search_index, repair_zero_price, run_full_sync};
use common::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::MockServer;

#[tokio::test]
async fn sync_repair_and_index_on_disk() {
    let server = MockServer::start().await;
    let new = find_target(codes::NEW).unwrap();
    mount_empty_searches(&server).await;
    mount_search(&server, new, 0, 1, &["D1", "D2"]).await;
    mount_detail(&server, "D1", detail_body("D1", Some(300.0), None)).await;
    mount_detail(&server, "D2", detail_body("D2", Some(0.0), None)).await;

    let tmp = TempDir::new().unwrap();
    let store = LocalStorage::new(tmp.path());
    store
        .put_product(
            "GONE",
            json!({ "status": "deleted", "additionalCategories": ["New"] })
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await
        .unwrap();

    let config = config_for(&server);
    let result = run_full_sync(&config, &store).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.saved, 2);
    assert_eq!(result.cleaned, 1);

    let d1 = store.product_document("D1").await.unwrap().unwrap();
    assert_eq!(d1["status"], "active");
    assert!(tags(&d1).contains(&"New".to_string()));
    assert!(tags(&store.product_document("GONE").await.unwrap().unwrap()).is_empty());

    let progress = store.load_progress().await.unwrap().unwrap();
    assert_eq!(progress.steps[2].total, 2);
    assert!(tmp.path().join("system/syncStatus.json").exists());
    assert!(!tmp.path().join("system/lease_full_sync.json").exists());

    // D2 came back with no price; the repair picks it up once the source has one
    server.reset().await;
    mount_detail(&server, "D2", detail_body("D2", Some(450.0), Some(500.0))).await;
    let repair = repair_zero_price(&config, &store).await;
    assert!(repair.success);
    assert_eq!(repair.updated, 1);
    let d2 = store.product_document("D2").await.unwrap().unwrap();
    assert_eq!(number(&d2, "price"), Some(450.0));
    assert_eq!(d2["hasDiscount"], true);

    let index = rebuild_search_index(&config, &store).await;
    assert!(index.success);
    assert_eq!(index.total_items, 2);
    assert_eq!(index.total_chunks, 1);

    let meta = store
        .read_document("system/search_index_meta")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta["totalItems"], 2);
    let chunk = store
        .read_document("system/search_index_0")
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<&str> = chunk["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["id"].as_str())
        .collect();
    assert_eq!(ids, ["D1", "D2"]);
}

#[tokio::test]
async fn index_splits_into_chunks() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStorage::new(tmp.path());
    for i in 0..5 {
        store
            .put_product(
                &format!("I{i}"),
                json!({ "name": format!("Item {i}"), "price": 10 })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let mut config = catalog_sync::models::Config::default();
    config.index.chunk_size = 2;
    let result = rebuild_search_index(&config, &store).await;

    assert!(result.success);
    assert_eq!(result.total_items, 5);
    assert_eq!(result.total_chunks, 3);
    let last = store
        .read_document("system/search_index_2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last["count"], 1);
    assert_eq!(last["totalChunks"], 3);
}
