//! 検出結果の正規化モジュール
//!
//! ## 処理フロー
//! 1. 信頼度フィルタ（閾値未満を除外）
//! 2. 名前の正規化（小文字化・単数形化・先頭大文字化）
//! 3. 同名の検出をグループ化し、1件に統合（数量 = 件数、信頼度 = 最大値）
//! 4. カテゴリの解決（不明は OTHER）
//! 5. 信頼度の降順でソート（同値は発見順を維持）

use crate::types::{CanonicalItem, CategoryTag, RawDetection};
use std::collections::HashMap;

/// デフォルトの信頼度閾値
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// 単数形化しない単語（すでに単数、または複数形に見える単語）
pub const SINGULAR_EXCEPTIONS: &[&str] = &[
    "cheese",
    "lettuce",
    "rice",
    "juice",
    "sauce",
    "hummus",
    "asparagus",
    "broccoli",
    "celery",
];

/// 複数形 → 単数形の置換ルール
#[derive(Debug, Clone, Copy)]
pub struct SuffixRule {
    pub suffix: &'static str,
    pub replacement: &'static str,
    /// 単語長がサフィックス長よりこの値を超えて長い場合のみ適用
    pub stem_guard: usize,
    /// 語幹が歯擦音（s, x, z, ch, sh）で終わる場合のみ適用
    pub sibilant_stem: bool,
}

/// 上から順に評価し、最初に一致したルールだけを適用する
pub const PLURAL_RULES: &[SuffixRule] = &[
    SuffixRule { suffix: "ies", replacement: "y", stem_guard: 2, sibilant_stem: false }, // berries -> berry
    SuffixRule { suffix: "ves", replacement: "f", stem_guard: 2, sibilant_stem: false }, // leaves -> leaf
    SuffixRule { suffix: "oes", replacement: "o", stem_guard: 2, sibilant_stem: false }, // tomatoes -> tomato
    SuffixRule { suffix: "es", replacement: "", stem_guard: 2, sibilant_stem: true },    // boxes -> box
    SuffixRule { suffix: "s", replacement: "", stem_guard: 2, sibilant_stem: false },    // apples -> apple
];

impl SuffixRule {
    fn apply(&self, word: &str) -> Option<String> {
        let stem = word.strip_suffix(self.suffix)?;
        if word.chars().count() <= self.suffix.chars().count() + self.stem_guard {
            return None;
        }
        if self.sibilant_stem && !ends_with_sibilant(stem) {
            return None;
        }
        Some(format!("{}{}", stem, self.replacement))
    }
}

fn ends_with_sibilant(stem: &str) -> bool {
    ["s", "x", "z", "ch", "sh"].iter().any(|s| stem.ends_with(s))
}

/// 先頭1文字だけ大文字にする（残りはそのまま）
fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 食品名を正規化する
///
/// # Examples
/// ```
/// use pantry_scan_common::normalize_name;
///
/// assert_eq!(normalize_name("  Tomatoes "), "Tomato");
/// assert_eq!(normalize_name("cheese"), "Cheese");
/// ```
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let normalized = lowered.trim();

    if SINGULAR_EXCEPTIONS.contains(&normalized) {
        return capitalize_first(normalized);
    }

    let singular = PLURAL_RULES
        .iter()
        .find_map(|rule| rule.apply(normalized))
        .unwrap_or_else(|| normalized.to_string());

    capitalize_first(&singular)
}

/// 同名グループの集計中の状態
struct MergeGroup<'a> {
    name: String,
    best: &'a RawDetection,
    count: u32,
}

/// 検出結果を在庫アイテムへ正規化する
///
/// 失敗しない。空入力は空出力。
///
/// # Arguments
/// * `detections` - Vision APIの検出結果（入力順は結果に影響する）
/// * `threshold` - この値未満の信頼度を除外
pub fn normalize_detections(detections: &[RawDetection], threshold: f32) -> Vec<CanonicalItem> {
    let mut groups: Vec<MergeGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for detection in detections.iter().filter(|d| d.confidence >= threshold) {
        let name = normalize_name(&detection.name);
        match index.get(&name) {
            Some(&i) => {
                let group = &mut groups[i];
                group.count += 1;
                // 同値の場合は先に現れた方を残す
                if detection.confidence > group.best.confidence {
                    group.best = detection;
                }
            }
            None => {
                index.insert(name.clone(), groups.len());
                groups.push(MergeGroup { name, best: detection, count: 1 });
            }
        }
    }

    let mut items: Vec<CanonicalItem> = groups
        .into_iter()
        .map(|group| {
            CanonicalItem::new(
                group.name,
                CategoryTag::from_str_lossy(&group.best.category),
                group.best.confidence,
                group.count,
            )
        })
        .collect();

    // 安定ソートなので同値は発見順のまま
    items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    items
}
