//! Vision API連携
//!
//! バックエンドは「画像 + 指示文を送ってテキストを受け取る」だけの外部サービスとして扱う。
//! 再試行はしない（呼び出し側が判断する）。

pub mod gemini;

pub use gemini::GeminiBackend;

use crate::error::Result;
use crate::preprocess::PreparedImage;
use async_trait::async_trait;

#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// 画像群とプロンプトを送信し、生成テキストを返す
    ///
    /// テキストが返らなかった場合は `Ok(None)`。
    async fn analyze(&self, images: &[PreparedImage], prompt: &str) -> Result<Option<String>>;
}
