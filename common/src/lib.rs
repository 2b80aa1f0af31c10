//! Pantry Scan Common Library
//!
//! 画像処理・通信を含まない共通部分:
//! 型定義、Vision APIレスポンスのパース、検出結果の正規化、プロンプト

pub mod types;
pub mod error;
pub mod parser;
pub mod normalizer;
pub mod prompts;

pub use types::{CanonicalItem, CategoryTag, DetectionResponse, RawDetection};
pub use error::ParseError;
pub use parser::{extract_items_object, parse_detection_response, strip_code_fence};
pub use normalizer::{normalize_detections, normalize_name, DEFAULT_CONFIDENCE_THRESHOLD};
pub use prompts::build_vision_prompt;
