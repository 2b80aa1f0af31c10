//! 在庫ストアの統合テスト
//!
//! JsonStoreの永続化・並び順・ライブ更新を検証

use futures::StreamExt;
use pantry_scan::store::{InventoryStore, JsonStore, StoreError};
use pantry_scan_common::{CanonicalItem, CategoryTag};
use std::time::Duration;
use tempfile::tempdir;

fn item_at(name: &str, added_at: i64) -> CanonicalItem {
    let mut item = CanonicalItem::new(name, CategoryTag::Other, 0.9, 1);
    item.added_at = added_at;
    item
}

fn names(items: &[CanonicalItem]) -> Vec<&str> {
    items.iter().map(|i| i.name.as_str()).collect()
}

async fn snapshot(store: &JsonStore) -> Vec<CanonicalItem> {
    store.get_all().next().await.expect("stream ended")
}

/// 空のストア
#[tokio::test]
async fn test_empty_store() {
    let store = JsonStore::in_memory();
    assert!(snapshot(&store).await.is_empty());
}

/// 登録時刻の降順、同時刻は登録順
#[tokio::test]
async fn test_get_all_ordering() {
    let store = JsonStore::in_memory();
    store
        .insert_batch(vec![
            item_at("Milk", 100),
            item_at("Egg", 300),
            item_at("Butter", 200),
            item_at("Cheese", 200),
        ])
        .await
        .unwrap();

    let items = snapshot(&store).await;
    assert_eq!(names(&items), vec!["Egg", "Butter", "Cheese", "Milk"]);
}

/// 同じIDは置き換え
#[tokio::test]
async fn test_insert_replaces_same_id() {
    let store = JsonStore::in_memory();
    let item = item_at("Milk", 100);
    store.insert(item.clone()).await.unwrap();

    let mut replaced = item.clone();
    replaced.quantity = 3;
    store.insert(replaced).await.unwrap();

    let items = snapshot(&store).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
}

/// 存在しないIDの更新は何もしない
#[tokio::test]
async fn test_update_unknown_id_is_noop() {
    let store = JsonStore::in_memory();
    store.insert(item_at("Milk", 100)).await.unwrap();

    store.update(item_at("Ghost", 200)).await.unwrap();

    let items = snapshot(&store).await;
    assert_eq!(names(&items), vec!["Milk"]);
}

#[tokio::test]
async fn test_update_and_get_by_id() {
    let store = JsonStore::in_memory();
    let item = item_at("Milk", 100);
    store.insert(item.clone()).await.unwrap();

    store.update(item.with_quantity_delta(4)).await.unwrap();

    let found = store.get_by_id(item.id).await.unwrap().expect("item missing");
    assert_eq!(found.quantity, 5);
    assert!(store.get_by_id(uuid::Uuid::new_v4()).await.unwrap().is_none());
}

/// 数量0は拒否
#[tokio::test]
async fn test_zero_quantity_rejected() {
    let store = JsonStore::in_memory();
    let mut item = item_at("Milk", 100);
    item.quantity = 0;

    let result = store.insert(item.clone()).await;
    assert!(matches!(result, Err(StoreError::InvalidQuantity(_))));

    // 一括登録は1件でも不正なら全件拒否
    let result = store.insert_batch(vec![item_at("Egg", 100), item]).await;
    assert!(matches!(result, Err(StoreError::InvalidQuantity(_))));
    assert!(snapshot(&store).await.is_empty());
}

#[tokio::test]
async fn test_delete_and_delete_all() {
    let store = JsonStore::in_memory();
    let milk = item_at("Milk", 100);
    let egg = item_at("Egg", 200);
    store.insert_batch(vec![milk.clone(), egg.clone()]).await.unwrap();

    store.delete(&milk).await.unwrap();
    assert_eq!(names(&snapshot(&store).await), vec!["Egg"]);

    // 存在しないIDの削除はエラーにしない
    store.delete_by_id(milk.id).await.unwrap();

    store.delete_all().await.unwrap();
    assert!(snapshot(&store).await.is_empty());
}

/// 部分一致・大文字小文字を区別しない
#[tokio::test]
async fn test_search() {
    let store = JsonStore::in_memory();
    store
        .insert_batch(vec![
            item_at("Whole Milk", 100),
            item_at("Milk Chocolate", 200),
            item_at("Egg", 300),
        ])
        .await
        .unwrap();

    let found = store.search("milk").next().await.unwrap();
    assert_eq!(names(&found), vec!["Milk Chocolate", "Whole Milk"]);

    let none = store.search("bread").next().await.unwrap();
    assert!(none.is_empty());
}

/// 変更がストリームに流れる
#[tokio::test]
async fn test_live_stream_updates() {
    let store = JsonStore::in_memory();
    let mut stream = store.get_all();

    let first = stream.next().await.unwrap();
    assert!(first.is_empty());

    store.insert(item_at("Milk", 100)).await.unwrap();

    let second = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("no update received")
        .unwrap();
    assert_eq!(names(&second), vec!["Milk"]);
}

/// 検索ストリームもライブ更新される
#[tokio::test]
async fn test_search_stream_updates() {
    let store = JsonStore::in_memory();
    let mut stream = store.search("egg");
    assert!(stream.next().await.unwrap().is_empty());

    store.insert(item_at("Eggplant", 100)).await.unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("no update received")
        .unwrap();
    assert_eq!(names(&updated), vec!["Eggplant"]);
}

/// ファイルへの保存と再読み込み
#[tokio::test]
async fn test_persist_and_reopen() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("inventory.json");

    {
        let store = JsonStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store
            .insert_batch(vec![item_at("Milk", 100), item_at("Egg", 200)])
            .await
            .unwrap();
    }
    assert!(path.exists());

    let reopened = JsonStore::open(&path).unwrap();
    let items = snapshot(&reopened).await;
    assert_eq!(names(&items), vec!["Egg", "Milk"]);
}

/// 壊れたファイルはエラー
#[tokio::test]
async fn test_open_corrupt_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("inventory.json");
    std::fs::write(&path, "not json").unwrap();

    let result = JsonStore::open(&path);
    assert!(matches!(result, Err(StoreError::Serialize(_))));
}

/// 保存後に一時ファイルが残らない
#[tokio::test]
async fn test_persist_leaves_no_temp_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("inventory.json");

    let store = JsonStore::open(&path).unwrap();
    store.insert(item_at("Milk", 100)).await.unwrap();

    assert!(path.exists());
    assert!(!dir.path().join("inventory.json.tmp").exists());
}

/// 書き込みに失敗しても既存の在庫ファイルは壊れない
#[tokio::test]
async fn test_failed_write_keeps_previous_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("inventory.json");

    let store = JsonStore::open(&path).unwrap();
    store.insert(item_at("Milk", 100)).await.unwrap();

    // 一時ファイルの位置をディレクトリで塞いで書き込みを失敗させる
    std::fs::create_dir(dir.path().join("inventory.json.tmp")).unwrap();
    let result = store.insert(item_at("Egg", 200)).await;
    assert!(matches!(result, Err(StoreError::Io(_))));

    // メモリ上の状態も変わらない
    assert_eq!(names(&snapshot(&store).await), vec!["Milk"]);

    let reopened = JsonStore::open(&path).unwrap();
    assert_eq!(names(&snapshot(&reopened).await), vec!["Milk"]);
}
