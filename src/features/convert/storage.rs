//! 上传工作目录：文件名清洗、按请求暂存与输出读取
//!
//! 客户端提交的文件名从不参与落盘路径：`content_addressed` 模式下以内容摘要命名，
//! `ephemeral` 模式下使用每请求独占的临时目录。

use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use crate::config::StorageMode;
use crate::error::AppError;

use super::codec::{self, InputFormat};

/// 清洗后文件名主体的最大字符数
const MAX_STEM_CHARS: usize = 100;

/// 无法从客户端文件名得到有效名称时的兜底名
const FALLBACK_NAME: &str = "upload";

/// 上传文件存储
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    mode: StorageMode,
}

/// 一次请求的暂存结果。
///
/// `ephemeral` 模式下持有临时目录，drop 时连同输入/输出文件一起删除。
#[derive(Debug)]
pub struct StagedUpload {
    input: PathBuf,
    _workspace: Option<TempDir>,
}

impl StagedUpload {
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> PathBuf {
        codec::jpeg_output_path(&self.input)
    }
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, mode: StorageMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// 确保上传目录存在（幂等）
    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// 将上传内容原样写入工作目录，返回输入文件位置。阻塞调用。
    pub fn stage(
        &self,
        bytes: &[u8],
        format: InputFormat,
        digest: &str,
    ) -> Result<StagedUpload, AppError> {
        match self.mode {
            StorageMode::ContentAddressed => {
                let input = self.root.join(format!("{digest}.{}", format.extension()));
                if input.is_file() {
                    tracing::debug!("复用已存在的上传文件: {:?}", input);
                } else {
                    write_atomic(&input, bytes)?;
                }
                Ok(StagedUpload {
                    input,
                    _workspace: None,
                })
            }
            StorageMode::Ephemeral => {
                let workspace = tempfile::Builder::new()
                    .prefix("convert-")
                    .tempdir_in(&self.root)?;
                let input = workspace
                    .path()
                    .join(format!("upload.{}", format.extension()));
                std::fs::write(&input, bytes)?;
                Ok(StagedUpload {
                    input,
                    _workspace: Some(workspace),
                })
            }
        }
    }
}

/// 上传内容的 SHA-256（小写十六进制）
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// 先写入同目录临时文件再重命名，读者不会看到写了一半的文件
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// 读取转换结果；文件不存在时视为服务端故障
pub async fn read_output(path: &Path) -> Result<Vec<u8>, AppError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::OutputMissing(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// 清洗客户端文件名：只保留最后一个路径分量，非 `[A-Za-z0-9._-]` 字符替换为 `_`，
/// 去掉开头的点。结果可安全放入 `Content-Disposition` 而无需转义。
pub fn sanitize_filename(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// 下载文件名：清洗后的主体 + `.jpg`
pub fn download_name(sanitized: &str) -> String {
    let stem = Path::new(sanitized)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_NAME);
    let stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    format!("{stem}.jpg")
}

/// 保留原始字符的下载文件名（用于 `filename*`）。
///
/// 只在客户端文件名含非 ASCII 字符时返回；控制字符会被去掉。
pub fn unicode_download_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_ascii() {
        return None;
    }
    let stem = Path::new(cleaned)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())?;
    let stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    Some(format!("{stem}.jpg"))
}
