//! 画像前処理モジュール
//!
//! Vision APIへ送る前に、1枚ずつ以下を行う:
//! 1. 縮小デコード（寸法だけ先に読み、2の累乗で間引く）
//! 2. 向きの補正（撮影時の回転 / EXIF Orientation）
//! 3. 最大辺に収まるよう縮小（拡大はしない）
//! 4. JPEG圧縮
//!
//! どの段階で失敗してもその画像はバッチから外すだけで、バッチ全体は止めない。

mod source;

pub use source::{ImageSource, Rotation};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader, Limits, RgbImage};
use jpeg_decoder::PixelFormat;
use rayon::prelude::*;
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

/// Vision APIへ送る画像の最大辺（px）
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// JPEG圧縮品質 (0-100)
pub const COMPRESSION_QUALITY: u8 = 85;

/// 受け付ける元画像の最大辺（px）
pub const MAX_SOURCE_DIMENSION: u32 = 20_000;

/// デコード時の最大確保量（バイト）
const MAX_DECODE_ALLOC: usize = 512 * 1024 * 1024;

/// 1枚の画像の処理エラー
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("画像形式を判別できません: {0}")]
    UnknownFormat(#[source] std::io::Error),

    #[error("画像処理エラー: {0}")]
    Image(#[from] image::ImageError),

    #[error("JPEGデコードエラー: {0}")]
    Jpeg(#[from] jpeg_decoder::Error),

    #[error("画像サイズが0です")]
    ZeroSized,

    #[error("画像が大きすぎます: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
}

/// 前処理の設定
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub max_dimension: u32,
    pub quality: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            max_dimension: MAX_IMAGE_DIMENSION,
            quality: COMPRESSION_QUALITY,
        }
    }
}

/// 送信用に圧縮済みの画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl PreparedImage {
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

/// 間引き係数を計算
///
/// 縦横の半分をそれぞれ係数で割った値が両方とも `max_dimension` 以上である間、係数を倍にする。
pub fn sample_factor(width: u32, height: u32, max_dimension: u32) -> u32 {
    let mut factor = 1;
    if max_dimension == 0 {
        return factor;
    }

    if height > max_dimension || width > max_dimension {
        let half_height = height / 2;
        let half_width = width / 2;

        while half_height / factor >= max_dimension && half_width / factor >= max_dimension {
            factor *= 2;
        }
    }

    factor
}

fn reader_for(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(DecodeError::UnknownFormat)
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC as u64);
    limits
}

/// JPEGをDCT段階で縮小してデコードする（1/2, 1/4, 1/8）
///
/// RGB・グレースケール以外（CMYKなど）は `None` を返し、通常デコードに任せる。
fn decode_jpeg_scaled(bytes: &[u8], factor: u32) -> Result<Option<DynamicImage>, DecodeError> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    decoder.set_max_decoding_buffer_size(MAX_DECODE_ALLOC);
    decoder.read_info()?;

    let Some(info) = decoder.info() else {
        return Ok(None);
    };
    if !matches!(info.pixel_format, PixelFormat::RGB24 | PixelFormat::L8) {
        return Ok(None);
    }

    let requested = |side: u16| u16::try_from((u32::from(side) / factor).max(1)).unwrap_or(side);
    let (width, height) = decoder.scale(requested(info.width), requested(info.height))?;
    let pixels = decoder.decode()?;
    let (width, height) = (u32::from(width), u32::from(height));

    let image = match info.pixel_format {
        PixelFormat::RGB24 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        _ => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
    };
    Ok(image)
}

/// 寸法を先に読み、間引き係数を決めてからデコードする
///
/// JPEGはデコード時点で縮小するので元の解像度を展開しない。
/// それ以外の形式はデコード後に係数分だけ間引く。
pub fn decode_bounded(bytes: &[u8], max_dimension: u32) -> Result<DynamicImage, DecodeError> {
    let reader = reader_for(bytes)?;
    let format = reader.format();
    let (width, height) = reader.into_dimensions()?;
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroSized);
    }
    if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
        return Err(DecodeError::TooLarge { width, height });
    }

    let factor = sample_factor(width, height, max_dimension);
    let (target_width, target_height) = (width / factor, height / factor);

    let scaled = if factor > 1 && format == Some(ImageFormat::Jpeg) {
        decode_jpeg_scaled(bytes, factor)?
    } else {
        None
    };
    let image = match scaled {
        Some(image) => image,
        None => {
            let mut reader = reader_for(bytes)?;
            reader.limits(decode_limits());
            reader.decode()?
        }
    };

    // JPEGは1/8までしか縮小できず、端数は切り上げになる
    if image.width() > target_width || image.height() > target_height {
        debug!(width, height, factor, "間引きデコード");
        Ok(image.resize_exact(target_width, target_height, FilterType::Nearest))
    } else {
        Ok(image)
    }
}

/// 回転を適用（0度ならそのまま）
pub fn correct_orientation(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => image,
        Rotation::Clockwise90 => image.rotate90(),
        Rotation::Clockwise180 => image.rotate180(),
        Rotation::Clockwise270 => image.rotate270(),
    }
}

/// 最大辺が `max_dimension` に収まるよう縮小する（拡大はしない）
pub fn fit_within_bounds(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);

    if longest <= max_dimension {
        return image;
    }

    // scale = max_dimension / longest を整数演算で適用
    let scaled = |side: u32| ((side as u64 * max_dimension as u64) / longest as u64).max(1) as u32;
    let (new_width, new_height) = (scaled(width), scaled(height));

    debug!(width, height, new_width, new_height, "縮小");
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// JPEGに圧縮
pub fn compress(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, DecodeError> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    // JPEGはアルファを持てないのでRGBへ
    image.to_rgb8().write_with_encoder(encoder)?;
    Ok(bytes)
}

fn try_prepare(source: &ImageSource, options: &PreprocessOptions) -> Result<PreparedImage, DecodeError> {
    let decoded = decode_bounded(&source.bytes, options.max_dimension)?;
    let oriented = correct_orientation(decoded, source.rotation);
    let fitted = fit_within_bounds(oriented, options.max_dimension);
    let bytes = compress(&fitted, options.quality)?;

    debug!(
        label = %source.label,
        width = fitted.width(),
        height = fitted.height(),
        size = bytes.len(),
        "圧縮完了"
    );

    Ok(PreparedImage {
        bytes,
        width: fitted.width(),
        height: fitted.height(),
        quality: options.quality,
    })
}

/// 1枚を前処理する。失敗時は `None`
pub fn prepare_image(source: &ImageSource, options: &PreprocessOptions) -> Option<PreparedImage> {
    match try_prepare(source, options) {
        Ok(prepared) => Some(prepared),
        Err(e) => {
            warn!(label = %source.label, error = %e, "画像をスキップ");
            None
        }
    }
}

/// バッチを並列に前処理する
///
/// 入力順を保ち、失敗した画像は除外する。
pub fn prepare_batch(sources: &[ImageSource], options: &PreprocessOptions) -> Vec<PreparedImage> {
    sources
        .par_iter()
        .map(|source| prepare_image(source, options))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
