use crate::preprocess::DecodeError;
use crate::store::StoreError;
use pantry_scan_common::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PantryScanError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`pantry-scan config --set-api-key YOUR_KEY` で設定するか GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("解析できる画像がありません: {0}")]
    NoImagesFound(String),

    /// `preprocess::decode_bounded` などを直接使う呼び出し側向け。
    /// バッチ前処理では画像ごとに吸収され、このエラーにはならない。
    #[error("画像デコードエラー: {0}")]
    Decode(#[from] DecodeError),

    #[error("Vision API呼び出しエラー: {0}")]
    Backend(String),

    #[error("Vision APIレスポンスのパースに失敗: {0}")]
    Parse(#[from] ParseError),

    #[error("在庫ストアエラー: {0}")]
    Store(#[from] StoreError),

    #[error("内部タスクエラー: {0}")]
    Task(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PantryScanError>;
