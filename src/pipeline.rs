//! スキャンパイプライン
//!
//! 画像前処理 → Vision API → パース → 正規化 → ストアへ一括登録。
//! パースまで成功した場合だけストアに書き込む（1スキャン単位で全か無か）。
//! 同時に複数のスキャンを走らせないのは呼び出し側の責任。
//! 途中で future を破棄した場合はストアに触れず、状態は Error になる。

use crate::backend::VisionBackend;
use crate::error::{PantryScanError, Result};
use crate::preprocess::{prepare_batch, ImageSource, PreparedImage, PreprocessOptions};
use crate::store::InventoryStore;
use pantry_scan_common::{
    build_vision_prompt, normalize_detections, parse_detection_response, CanonicalItem,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// スキャンの進行状態
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Processing { photo_count: usize },
    Success { items: Vec<CanonicalItem> },
    Error { message: String },
}

/// 完了前に破棄されたスキャンの状態メッセージ
pub const CANCELLED_MESSAGE: &str = "スキャンが中断されました";

/// `run` の future が途中で破棄されたとき、Processing のまま残さない
struct ScanGuard<'a> {
    state: &'a watch::Sender<ScanState>,
    finished: bool,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("スキャン中断");
            self.state.send_replace(ScanState::Error {
                message: CANCELLED_MESSAGE.to_string(),
            });
        }
    }
}

/// パイプライン設定
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub preprocess: PreprocessOptions,
    pub confidence_threshold: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            preprocess: PreprocessOptions::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

pub struct InventoryPipeline {
    backend: Arc<dyn VisionBackend>,
    store: Arc<dyn InventoryStore>,
    options: PipelineOptions,
    prompt: String,
    state: watch::Sender<ScanState>,
}

impl InventoryPipeline {
    pub fn new(
        backend: Arc<dyn VisionBackend>,
        store: Arc<dyn InventoryStore>,
        options: PipelineOptions,
    ) -> Self {
        let (state, _) = watch::channel(ScanState::Idle);
        Self {
            backend,
            store,
            options,
            prompt: build_vision_prompt(),
            state,
        }
    }

    /// 状態の購読
    pub fn subscribe_state(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    /// 状態をIdleに戻す
    pub fn reset_state(&self) {
        self.state.send_replace(ScanState::Idle);
    }

    /// 画像を解析して在庫へ登録し、登録したアイテムを返す
    pub async fn scan(&self, sources: Vec<ImageSource>) -> Result<Vec<CanonicalItem>> {
        self.run(sources, true).await
    }

    /// 画像を解析するだけ（ストアには書き込まない）
    pub async fn analyze(&self, sources: Vec<ImageSource>) -> Result<Vec<CanonicalItem>> {
        self.run(sources, false).await
    }

    async fn run(&self, sources: Vec<ImageSource>, commit: bool) -> Result<Vec<CanonicalItem>> {
        self.state.send_replace(ScanState::Processing { photo_count: sources.len() });
        let mut guard = ScanGuard {
            state: &self.state,
            finished: false,
        };

        let result = self.process(sources, commit).await;
        guard.finished = true;

        self.state.send_replace(match &result {
            Ok(items) => ScanState::Success { items: items.clone() },
            Err(e) => ScanState::Error { message: e.to_string() },
        });
        result
    }

    async fn process(&self, sources: Vec<ImageSource>, commit: bool) -> Result<Vec<CanonicalItem>> {
        let total = sources.len();
        let images = self.preprocess(sources).await?;
        if images.is_empty() {
            return Err(PantryScanError::NoImagesFound(format!("{}枚すべての前処理に失敗", total)));
        }
        info!(prepared = images.len(), total, "前処理完了");

        let response = self.backend.analyze(&images, &self.prompt).await?;
        debug!(response_len = response.as_ref().map(|r| r.len()).unwrap_or(0), "レスポンス受信");

        let detections = parse_detection_response(response.as_deref())?;
        let items = normalize_detections(&detections, self.options.confidence_threshold);
        info!(detections = detections.len(), items = items.len(), "正規化完了");

        if commit {
            self.store.insert_batch(items.clone()).await?;
        }

        Ok(items)
    }

    /// CPU処理なのでブロッキングスレッドで実行
    async fn preprocess(&self, sources: Vec<ImageSource>) -> Result<Vec<PreparedImage>> {
        let options = self.options.preprocess;
        tokio::task::spawn_blocking(move || prepare_batch(&sources, &options))
            .await
            .map_err(|e| PantryScanError::Task(format!("前処理: {}", e)))
    }
}
