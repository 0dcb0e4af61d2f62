use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 缺少上传文件时返回的固定提示（保持与旧接口一致）
pub const NO_FILE_UPLOADED: &str = "No file uploaded";

/// 5xx 响应对外展示的通用描述，内部细节只进日志
const INTERNAL_DETAIL: &str = "服务器内部错误，请稍后重试";

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 请求中没有名为 `file` 的上传文件
    #[error("No file uploaded")]
    MissingFile,

    /// multipart 请求体格式错误
    #[error("multipart 解析失败: {0}")]
    InvalidMultipart(String),

    /// 请求体超过上限
    #[error("上传文件过大: {0}")]
    PayloadTooLarge(String),

    /// 输入格式不在支持列表中
    #[error("不支持的输入格式: {0}")]
    UnsupportedFormat(String),

    /// 图片解码或编码失败（损坏的文件、不支持的变体）
    #[error("图片解码失败: {0}")]
    DecodeFailure(String),

    /// 转换结束后输出文件不存在
    #[error("输出文件缺失: {0}")]
    OutputMissing(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 旧版错误响应体：`{"error": "..."}`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LegacyErrorBody {
    #[schema(example = "No file uploaded")]
    pub error: String,
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// - 所有 API 错误（缺少上传文件除外）返回结构化 JSON
/// - content-type = application/problem+json
/// - 5xx 的 detail 固定为通用描述
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Unsupported Media Type")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 415)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "UNSUPPORTED_FORMAT")]
    pub code: String,

    /// 可选：请求追踪 ID。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::DecodeFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OutputMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::MissingFile => "MISSING_FILE",
            AppError::InvalidMultipart(_) => "INVALID_MULTIPART",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AppError::DecodeFailure(_) => "IMAGE_DECODE_FAILED",
            AppError::OutputMissing(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::PAYLOAD_TOO_LARGE => "Payload Too Large",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "Unsupported Media Type",
            StatusCode::UNPROCESSABLE_ENTITY => "Unprocessable Entity",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }

    /// 是否为服务端自身故障（不向调用方透出细节）
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::MissingFile = self {
            let body = LegacyErrorBody {
                error: NO_FILE_UPLOADED.to_string(),
            };
            return (status, Json(body)).into_response();
        }

        let detail = if self.is_internal() {
            tracing::error!(code = self.stable_code(), "请求处理失败: {}", self);
            INTERNAL_DETAIL.to_string()
        } else {
            tracing::debug!(code = self.stable_code(), "请求被拒绝: {}", self);
            self.to_string()
        };

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(detail),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O 错误: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("后台转换任务失败: {err}"))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        match err {
            // 内存解码时的截断数据同样属于输入问题
            image::ImageError::IoError(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
                ) =>
            {
                AppError::DecodeFailure(e.to_string())
            }
            image::ImageError::IoError(e) => AppError::from(e),
            other => AppError::DecodeFailure(other.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::InvalidMultipart(err.body_text())
        }
    }
}
