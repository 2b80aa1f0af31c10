//! プロンプト生成モジュール
//!
//! Vision APIへ送る固定の指示文。出力形式は parser.rs が読む `{"items": [...]}`。

use crate::types::CategoryTag;

/// カテゴリの小文字表記をカンマ区切りで並べる
pub fn category_list() -> String {
    CategoryTag::ALL
        .iter()
        .map(|tag| tag.as_prompt_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 食品検出用プロンプト
pub fn build_vision_prompt() -> String {
    let categories = category_list();

    format!(
        r#"Analyze the image of a refrigerator.
List only visible food items.
Ignore containers, plates, and non-food objects.
Use generic food names in singular form.
Return a JSON object with an "items" array containing objects with:
- name: string (generic food name)
- category: string (one of: {categories})
- confidence: number (0-1)

Example response format:
{{"items":[{{"name":"milk","category":"dairy","confidence":0.95}}]}}

Return ONLY valid JSON, no explanations or markdown."#
    )
}
