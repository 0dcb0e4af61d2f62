//! 图片编解码：输入格式判定、透明通道扁平化与 JPEG 编码

use std::ffi::OsStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, ImageFormat, ImageReader, codecs::jpeg::JpegEncoder};

use crate::error::AppError;

use super::storage;

/// 支持转换的输入格式（封闭集合，新增格式需在此显式列出）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Png,
}

impl InputFormat {
    /// 全部支持的输入格式
    pub const ALL: [InputFormat; 1] = [InputFormat::Png];

    /// 按扩展名（大小写不敏感，不含点）匹配输入格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// 按文件路径的扩展名判定输入格式，不在支持列表中时返回 `UnsupportedFormat`
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path.extension().and_then(OsStr::to_str);
        ext.and_then(Self::from_extension).ok_or_else(|| {
            AppError::UnsupportedFormat(format!(
                "扩展名 {:?} 不受支持，仅接受 {}",
                ext.unwrap_or(""),
                Self::supported_list()
            ))
        })
    }

    /// 规范扩展名（小写）
    pub fn extension(self) -> &'static str {
        match self {
            InputFormat::Png => "png",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            InputFormat::Png => ImageFormat::Png,
        }
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|f| format!(".{}", f.extension()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// JPEG 编码参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegOptions {
    /// 质量 1-100
    pub quality: u8,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self { quality: 75 }
    }
}

/// 输出路径：输入路径去掉扩展名后追加 `.jpg`
pub fn jpeg_output_path(input: &Path) -> PathBuf {
    input.with_extension("jpg")
}

/// 将图片整理为 JPEG 可编码的颜色类型。
///
/// 带透明通道的图片（含灰度 + alpha）直接丢弃 alpha 并输出三通道 RGB，不与背景色合成；
/// 不透明灰度保持灰度，其余颜色类型与高位深统一转为 8 位 RGB。
pub fn flatten_for_jpeg(img: DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::L8 | ColorType::Rgb8 => img,
        ColorType::L16 => DynamicImage::ImageLuma8(img.to_luma8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// 以给定质量编码 JPEG（输入需已扁平化为 L8/Rgb8）
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    enc.encode(img.as_bytes(), img.width(), img.height(), img.color().into())
        .map_err(|e| AppError::DecodeFailure(format!("JPEG 编码失败: {e}")))?;
    Ok(out)
}

/// 内存中完成 解码 → 扁平化 → JPEG 编码
pub fn transcode_to_jpeg(
    bytes: &[u8],
    format: InputFormat,
    options: &JpegOptions,
) -> Result<Vec<u8>, AppError> {
    // 扩展名只决定是否受理；实际解码器按内容嗅探，识别不出时才退回扩展名对应的格式
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        reader.set_format(format.image_format());
    }
    let img = reader.decode()?;
    tracing::debug!(
        "解码完成: {}x{} {:?}",
        img.width(),
        img.height(),
        img.color()
    );
    encode_jpeg(&flatten_for_jpeg(img), options.quality)
}

/// 将磁盘上的图片转换为同名 `.jpg`，返回输出路径。
///
/// 阻塞调用，异步上下文中应放入 `spawn_blocking`。
pub fn convert_to_jpeg(input: &Path, options: &JpegOptions) -> Result<PathBuf, AppError> {
    let format = InputFormat::from_path(input)?;
    let output = jpeg_output_path(input);

    let bytes = std::fs::read(input)?;
    let jpeg = transcode_to_jpeg(&bytes, format, options)?;
    storage::write_atomic(&output, &jpeg)?;

    Ok(output)
}
