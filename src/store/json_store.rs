//! JSONファイル（またはメモリのみ）の在庫ストア

use super::{matches_query, sort_for_display, validate, InventoryStore, ItemStream, StoreResult};
use async_trait::async_trait;
use futures::StreamExt;
use pantry_scan_common::CanonicalItem;
use std::path::{Path, PathBuf};
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;
use uuid::Uuid;

pub struct JsonStore {
    /// 保存先（Noneならメモリのみ）
    path: Option<PathBuf>,
    /// 登録順のアイテム
    state: watch::Sender<Vec<CanonicalItem>>,
    write_lock: Mutex<()>,
}

impl JsonStore {
    fn with_items(path: Option<PathBuf>, items: Vec<CanonicalItem>) -> Self {
        let (state, _) = watch::channel(items);
        Self {
            path,
            state,
            write_lock: Mutex::new(()),
        }
    }

    /// メモリのみのストア
    pub fn in_memory() -> Self {
        Self::with_items(None, Vec::new())
    }

    /// JSONファイルを開く（なければ空で開始）
    pub fn open(path: &Path) -> StoreResult<Self> {
        let items = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), count = items.len(), "在庫ファイル読み込み");
        Ok(Self::with_items(Some(path.to_path_buf()), items))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 変更を適用して保存・通知する
    ///
    /// 保存に失敗した場合は通知しない。
    async fn mutate<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Vec<CanonicalItem>) -> bool,
    {
        let _guard = self.write_lock.lock().await;

        let mut items = self.state.borrow().clone();
        if !f(&mut items) {
            return Ok(());
        }

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            // 一時ファイルに書いてから置き換える
            let content = serde_json::to_string_pretty(&items)?;
            let temp = temp_path(path);
            tokio::fs::write(&temp, content).await?;
            tokio::fs::rename(&temp, path).await?;
        }

        self.state.send_replace(items);
        Ok(())
    }

    fn stream_with<F>(&self, filter: F) -> ItemStream
    where
        F: Fn(&CanonicalItem) -> bool + Send + 'static,
    {
        WatchStream::new(self.state.subscribe())
            .map(move |items| {
                sort_for_display(items.into_iter().filter(|item| filter(item)).collect())
            })
            .boxed()
    }
}

/// 保存先と同じディレクトリの一時ファイル（`inventory.json` → `inventory.json.tmp`）
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn upsert(items: &mut Vec<CanonicalItem>, item: CanonicalItem) {
    match items.iter_mut().find(|existing| existing.id == item.id) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

#[async_trait]
impl InventoryStore for JsonStore {
    fn get_all(&self) -> ItemStream {
        self.stream_with(|_| true)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<CanonicalItem>> {
        Ok(self.state.borrow().iter().find(|item| item.id == id).cloned())
    }

    async fn insert(&self, item: CanonicalItem) -> StoreResult<()> {
        validate(&item)?;
        self.mutate(|items| {
            upsert(items, item);
            true
        })
        .await
    }

    async fn insert_batch(&self, batch: Vec<CanonicalItem>) -> StoreResult<()> {
        for item in &batch {
            validate(item)?;
        }
        self.mutate(|items| {
            for item in batch {
                upsert(items, item);
            }
            true
        })
        .await
    }

    async fn update(&self, item: CanonicalItem) -> StoreResult<()> {
        validate(&item)?;
        self.mutate(|items| match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => {
                debug!(id = %item.id, "更新対象が存在しないためスキップ");
                false
            }
        })
        .await
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<()> {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        })
        .await
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.mutate(|items| {
            let changed = !items.is_empty();
            items.clear();
            changed
        })
        .await
    }

    fn search(&self, query: &str) -> ItemStream {
        let query = query.to_string();
        self.stream_with(move |item| matches_query(item, &query))
    }
}
