//! Gemini API連携
//!
//! generateContent に画像（inline_data, Base64 JPEG）とプロンプトを1リクエストで送る。

use super::VisionBackend;
use crate::config::Config;
use crate::error::{PantryScanError, Result};
use crate::preprocess::PreparedImage;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Gemini APIレスポンス
#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補のテキストを連結して返す
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn build_request(images: &[PreparedImage], prompt: &str) -> GeminiRequest {
    let mut parts: Vec<Part> = images
        .iter()
        .map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type().to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            },
        })
        .collect();
    parts.push(Part::Text { text: prompt.to_string() });

    GeminiRequest {
        contents: vec![Content { parts }],
    }
}

pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PantryScanError::Backend(format!("HTTPクライアント初期化エラー: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.get_api_key()?,
            config.model.clone(),
            config.api_base_url.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl VisionBackend for GeminiBackend {
    async fn analyze(&self, images: &[PreparedImage], prompt: &str) -> Result<Option<String>> {
        let request = build_request(images, prompt);
        debug!(images = images.len(), prompt_len = prompt.len(), model = %self.model, "Gemini リクエスト");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| PantryScanError::Backend(format!("リクエスト送信エラー: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PantryScanError::Backend(format!("API error {}: {}", status, body)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PantryScanError::Backend(format!("レスポンス読み込みエラー: {}", e)))?;

        let text = payload.text();
        info!(response_len = text.as_ref().map(|t| t.len()).unwrap_or(0), "Gemini レスポンス受信");
        Ok(text)
    }
}
