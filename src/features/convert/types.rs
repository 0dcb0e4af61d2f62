use std::path::Path;

use axum::{
    body::Bytes,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::AppError;

use super::codec::InputFormat;
use super::storage;

/// 客户端上传的文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// 客户端提交的原始文件名（仅用于日志）
    pub client_filename: String,
    /// 清洗后的文件名
    pub filename: String,
    /// 原始字节（不做任何修改）
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(client_filename: impl Into<String>, bytes: Bytes) -> Self {
        let client_filename = client_filename.into();
        let filename = storage::sanitize_filename(&client_filename);
        Self {
            client_filename,
            filename,
            bytes,
        }
    }

    /// 按扩展名判定输入格式
    pub fn format(&self) -> Result<InputFormat, AppError> {
        InputFormat::from_path(Path::new(&self.filename))
    }

    /// 返回给客户端的下载文件名
    pub fn download_name(&self) -> String {
        storage::download_name(&self.filename)
    }

    /// 含非 ASCII 字符时保留原文的下载文件名
    pub fn unicode_download_name(&self) -> Option<String> {
        storage::unicode_download_name(&self.client_filename)
    }
}

/// 转换完成的 JPEG
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    /// 仅含 token 字符的下载文件名
    pub download_name: String,
    /// 原始（非 ASCII）下载文件名，通过 `filename*` 下发
    pub unicode_name: Option<String>,
    pub bytes: Bytes,
    /// 上传内容的 SHA-256
    pub digest: String,
    /// 是否命中结果缓存
    pub cache_hit: bool,
}

/// RFC 5987 `attr-char` 之外的字节全部百分号编码
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

impl ConvertedFile {
    /// `attachment; filename=X.jpg[; filename*=UTF-8''...]`
    pub fn content_disposition(&self) -> String {
        // ASCII 文件名已清洗为 token 字符，无需加引号
        let mut value = format!("attachment; filename={}", self.download_name);
        if let Some(name) = &self.unicode_name {
            value.push_str("; filename*=UTF-8''");
            value.extend(utf8_percent_encode(name, ATTR_CHAR));
        }
        value
    }
}

impl IntoResponse for ConvertedFile {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&self.content_disposition())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// `POST /convert` 的 multipart 表单（仅用于 OpenAPI 文档）
#[derive(Debug, utoipa::ToSchema)]
pub struct ConvertUpload {
    /// 待转换的 PNG 文件
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploaded_file_sanitizes_but_keeps_client_name() {
        let upload = UploadedFile::new("../secret/Photo.PNG", Bytes::from_static(b"x"));
        assert_eq!(upload.client_filename, "../secret/Photo.PNG");
        assert_eq!(upload.filename, "Photo.PNG");
        assert_eq!(upload.download_name(), "Photo.jpg");
        assert_eq!(upload.format().expect("png"), InputFormat::Png);
    }

    #[test]
    fn converted_file_response_is_attachment() {
        let res = ConvertedFile {
            download_name: "photo.jpg".to_string(),
            unicode_name: None,
            bytes: Bytes::from_static(b"\xff\xd8"),
            digest: String::new(),
            cache_hit: false,
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=photo.jpg"
        );
    }

    #[test]
    fn non_ascii_name_is_sent_as_filename_star() {
        let upload = UploadedFile::new("照片 1.png", Bytes::from_static(b"x"));
        let file = ConvertedFile {
            download_name: upload.download_name(),
            unicode_name: upload.unicode_download_name(),
            bytes: Bytes::new(),
            digest: String::new(),
            cache_hit: false,
        };
        assert_eq!(
            file.content_disposition(),
            "attachment; filename=___1.jpg; filename*=UTF-8''%E7%85%A7%E7%89%87%201.jpg"
        );
    }
}
