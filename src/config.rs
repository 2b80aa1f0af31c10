use crate::error::{PantryScanError, Result};
use crate::preprocess::{COMPRESSION_QUALITY, MAX_IMAGE_DIMENSION};
use pantry_scan_common::DEFAULT_CONFIDENCE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    pub confidence_threshold: f32,
    pub timeout_seconds: u64,
    /// 在庫JSONの保存先（省略時はデータディレクトリ）
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".into(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            max_image_dimension: MAX_IMAGE_DIMENSION,
            jpeg_quality: COMPRESSION_QUALITY,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            timeout_seconds: 120,
            store_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PantryScanError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("pantry-scan").join("config.json"))
    }

    /// 在庫ファイルのパス
    pub fn resolved_store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| PantryScanError::Config("データディレクトリが見つかりません".into()))?;
        Ok(data_dir.join("pantry-scan").join("inventory.json"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or(PantryScanError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// 表示用にマスクしたAPIキー
    pub fn masked_api_key(&self) -> String {
        match &self.api_key {
            Some(key) if key.chars().count() > 8 => {
                let head: String = key.chars().take(4).collect();
                format!("{}****", head)
            }
            Some(_) => "****".into(),
            None => "未設定".into(),
        }
    }
}
