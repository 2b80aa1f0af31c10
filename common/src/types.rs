//! 在庫データの型定義
//!
//! - RawDetection: Vision APIが返す生の検出結果
//! - CategoryTag: 食品カテゴリ（閉じた列挙）
//! - CanonicalItem: 正規化・統合後の在庫アイテム

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Vision APIの検出結果（1件）
///
/// 値の検証は行わない。confidenceは範囲外でもそのまま保持する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDetection {
    pub name: String,
    pub category: String,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(name: impl Into<String>, category: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            confidence,
        }
    }
}

/// Vision APIレスポンス全体: `{"items": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub items: Vec<RawDetection>,
}

/// 食品カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryTag {
    Dairy,
    Meat,
    Vegetables,
    Fruits,
    Beverages,
    Condiments,
    Leftovers,
    Snacks,
    Frozen,
    #[default]
    Other,
}

impl CategoryTag {
    /// 全カテゴリ（宣言順）
    pub const ALL: [CategoryTag; 10] = [
        CategoryTag::Dairy,
        CategoryTag::Meat,
        CategoryTag::Vegetables,
        CategoryTag::Fruits,
        CategoryTag::Beverages,
        CategoryTag::Condiments,
        CategoryTag::Leftovers,
        CategoryTag::Snacks,
        CategoryTag::Frozen,
        CategoryTag::Other,
    ];

    /// タグ名（大文字）
    pub fn name(&self) -> &'static str {
        match self {
            CategoryTag::Dairy => "DAIRY",
            CategoryTag::Meat => "MEAT",
            CategoryTag::Vegetables => "VEGETABLES",
            CategoryTag::Fruits => "FRUITS",
            CategoryTag::Beverages => "BEVERAGES",
            CategoryTag::Condiments => "CONDIMENTS",
            CategoryTag::Leftovers => "LEFTOVERS",
            CategoryTag::Snacks => "SNACKS",
            CategoryTag::Frozen => "FROZEN",
            CategoryTag::Other => "OTHER",
        }
    }

    /// プロンプト用の小文字表記
    pub fn as_prompt_str(&self) -> String {
        self.name().to_lowercase()
    }

    /// 任意の文字列からカテゴリへ変換
    ///
    /// タグ名と大文字小文字を無視して完全一致したものを返す。
    /// 一致しなければ `Other`。
    pub fn from_str_lossy(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|tag| tag.name().eq_ignore_ascii_case(value))
            .unwrap_or(CategoryTag::Other)
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// 在庫アイテム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalItem {
    pub id: Uuid,
    pub name: String,
    pub category: CategoryTag,
    pub confidence: f32,
    pub quantity: u32,
    /// 登録時刻（Unixエポックからのミリ秒）
    pub added_at: i64,
}

impl CanonicalItem {
    /// 新しいIDと現在時刻でアイテムを作成
    pub fn new(name: impl Into<String>, category: CategoryTag, confidence: f32, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            confidence,
            quantity: quantity.max(1),
            added_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 手入力アイテム（confidence = 1.0）
    pub fn manual(name: impl Into<String>, category: CategoryTag, quantity: u32) -> Self {
        Self::new(name, category, 1.0, quantity)
    }

    /// 数量を増減したコピーを返す（最小1）
    pub fn with_quantity_delta(&self, delta: i64) -> Self {
        let quantity = (self.quantity as i64 + delta).clamp(1, u32::MAX as i64) as u32;
        Self {
            quantity,
            ..self.clone()
        }
    }
}
