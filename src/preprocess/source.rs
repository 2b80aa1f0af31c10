use crate::error::Result;
use crate::scanner::exif;
use std::path::Path;

/// 時計回りの回転角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    /// 角度から変換（90の倍数以外は回転なし）
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Clockwise90,
            180 => Rotation::Clockwise180,
            270 => Rotation::Clockwise270,
            _ => Rotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }
}

/// 前処理前の生画像
#[derive(Debug, Clone)]
pub struct ImageSource {
    /// ログ用の識別名（ファイル名など）
    pub label: String,
    pub bytes: Vec<u8>,
    pub rotation: Rotation,
}

impl ImageSource {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>, rotation: Rotation) -> Self {
        Self {
            label: label.into(),
            bytes,
            rotation,
        }
    }

    /// カメラ撮影画像（センサーの回転角を指定）
    pub fn from_capture(bytes: Vec<u8>, rotation_degrees: i32) -> Self {
        Self::new("capture", bytes, Rotation::from_degrees(rotation_degrees))
    }

    /// 保存済みファイル（EXIF Orientationから回転角を取得）
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let rotation = Rotation::from_degrees(exif::orientation_degrees(&bytes));
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::new(label, bytes, rotation))
    }
}
