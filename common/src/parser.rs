//! Vision APIレスポンスパーサー
//!
//! 生成系のバックエンドはJSONを説明文やコードフェンスで包んで返すことがある。
//! 直接デコード → `{ ... "items" ... }` 部分の抽出 → 再デコード の2段階で読む。

use crate::error::ParseError;
use crate::types::{DetectionResponse, RawDetection};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// 最初の `{` から最後の `}` まで（"items" を含むこと）。入れ子を含むので貪欲マッチ。
    static ref ITEMS_OBJECT: Regex = Regex::new(r#"(?s)\{.*"items".*\}"#).unwrap();
}

/// コードフェンス記号を除去して前後の空白を落とす
///
/// # Examples
/// ```
/// use pantry_scan_common::strip_code_fence;
///
/// let cleaned = strip_code_fence("```json\n{\"items\": []}\n```");
/// assert_eq!(cleaned, "{\"items\": []}");
/// ```
pub fn strip_code_fence(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// テキスト中から `"items"` を含むオブジェクト部分を抽出
pub fn extract_items_object(text: &str) -> Option<&str> {
    ITEMS_OBJECT.find(text).map(|m| m.as_str())
}

/// Vision APIレスポンスをパース
///
/// # Arguments
/// * `raw_text` - バックエンドが返したテキスト（`None` はテキストなし）
///
/// # Returns
/// * `Ok(Vec<RawDetection>)` - パース成功（空配列もあり得る）
/// * `Err(ParseError::EmptyResponse)` - テキストが空
/// * `Err(ParseError::InvalidFormat)` - JSONとして読めない
pub fn parse_detection_response(raw_text: Option<&str>) -> Result<Vec<RawDetection>, ParseError> {
    let raw_text = match raw_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(ParseError::EmptyResponse),
    };

    let cleaned = strip_code_fence(raw_text);

    match serde_json::from_str::<DetectionResponse>(&cleaned) {
        Ok(response) => Ok(response.items),
        Err(_) => {
            let candidate = extract_items_object(&cleaned).ok_or_else(|| {
                ParseError::InvalidFormat("no JSON object with \"items\" found".into())
            })?;
            serde_json::from_str::<DetectionResponse>(candidate)
                .map(|response| response.items)
                .map_err(|e| ParseError::InvalidFormat(format!("failed to decode items: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let text = r#"{"items":[{"name":"milk","category":"dairy","confidence":0.95}]}"#;
        let items = parse_detection_response(Some(text)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], RawDetection::new("milk", "dairy", 0.95));
    }

    #[test]
    fn test_parse_with_code_fence() {
        let text = "```json\n{\"items\": [\n  {\"name\": \"apples\", \"category\": \"fruits\", \"confidence\": 0.8}\n]}\n```\n";
        let items = parse_detection_response(Some(text)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "apples");
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let text = r#"Sure! Here is what I can see in the fridge:
{"items": [{"name": "egg", "category": "dairy", "confidence": 0.9}, {"name": "ham", "category": "meat", "confidence": 0.7}]}
Let me know if you need anything else."#;
        let items = parse_detection_response(Some(text)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "ham");
        assert_eq!(items[1].category, "meat");
    }

    #[test]
    fn test_parse_nested_braces_uses_greedy_span() {
        let text = r#"Result: {"items": [{"name": "yogurt", "category": "dairy", "confidence": 0.88}]} done"#;
        assert_eq!(
            extract_items_object(text),
            Some(r#"{"items": [{"name": "yogurt", "category": "dairy", "confidence": 0.88}]}"#)
        );
        let items = parse_detection_response(Some(text)).unwrap();
        assert_eq!(items[0].name, "yogurt");
    }

    #[test]
    fn test_parse_empty_items() {
        let items = parse_detection_response(Some(r#"{"items": []}"#)).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_empty_response() {
        assert_eq!(parse_detection_response(None), Err(ParseError::EmptyResponse));
        assert_eq!(parse_detection_response(Some("")), Err(ParseError::EmptyResponse));
        assert_eq!(parse_detection_response(Some("  \n ")), Err(ParseError::EmptyResponse));
    }

    #[test]
    fn test_parse_no_json() {
        let result = parse_detection_response(Some("I could not find any food in this image."));
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_broken_json_inside_prose() {
        let result = parse_detection_response(Some(r#"Here: {"items": [{"name": "milk", }"#));
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_missing_items_key() {
        let result = parse_detection_response(Some(r#"{"foods": []}"#));
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_keeps_out_of_range_confidence() {
        let text = r#"{"items":[{"name":"cake","category":"snacks","confidence":1.7}]}"#;
        let items = parse_detection_response(Some(text)).unwrap();
        assert_eq!(items[0].confidence, 1.7);
    }

    #[test]
    fn test_strip_code_fence_plain_fence() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }
}
