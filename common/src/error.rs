//! エラー型定義

use thiserror::Error;

/// Vision APIレスポンスのパースエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty response from vision backend")]
    EmptyResponse,

    #[error("Invalid JSON response from vision backend: {0}")]
    InvalidFormat(String),
}
