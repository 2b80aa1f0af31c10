//! 在庫ストア
//!
//! 取得系はライブ更新されるストリーム（変更のたびに最新スナップショットを流す）。
//! 並び順は登録時刻の降順、同時刻は登録順。

mod json_store;

pub use json_store::JsonStore;

use async_trait::async_trait;
use futures::stream::BoxStream;
use pantry_scan_common::CanonicalItem;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("数量は1以上である必要があります: {0}")]
    InvalidQuantity(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("シリアライズエラー: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 在庫スナップショットのストリーム
pub type ItemStream = BoxStream<'static, Vec<CanonicalItem>>;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// 全件（登録時刻の降順）
    fn get_all(&self) -> ItemStream;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<CanonicalItem>>;

    /// 追加（同じIDがあれば置き換え）
    async fn insert(&self, item: CanonicalItem) -> StoreResult<()>;

    /// 一括追加（1回の更新として反映）
    async fn insert_batch(&self, items: Vec<CanonicalItem>) -> StoreResult<()>;

    /// 更新（存在しないIDは何もしない）
    async fn update(&self, item: CanonicalItem) -> StoreResult<()>;

    async fn delete(&self, item: &CanonicalItem) -> StoreResult<()> {
        self.delete_by_id(item.id).await
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<()>;

    async fn delete_all(&self) -> StoreResult<()>;

    /// 名前の部分一致（大文字小文字を区別しない）
    fn search(&self, query: &str) -> ItemStream;
}

/// 表示順に並べ替える（安定ソート）
pub(crate) fn sort_for_display(mut items: Vec<CanonicalItem>) -> Vec<CanonicalItem> {
    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    items
}

pub(crate) fn matches_query(item: &CanonicalItem, query: &str) -> bool {
    item.name.to_lowercase().contains(&query.to_lowercase())
}

fn validate(item: &CanonicalItem) -> StoreResult<()> {
    if item.quantity == 0 {
        return Err(StoreError::InvalidQuantity(item.name.clone()));
    }
    Ok(())
}
