use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    routing::post,
};

use crate::{
    error::{AppError, LegacyErrorBody, ProblemDetails},
    state::AppState,
};

use super::types::{ConvertUpload, ConvertedFile, UploadedFile};

/// 上传表单中文件字段的名称
const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/convert",
    summary = "PNG 转 JPEG",
    description = "上传 multipart 表单字段 `file`（PNG），返回转换后的 JPEG 附件。带透明通道的图片会直接丢弃 alpha 通道。",
    request_body(content = ConvertUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "JPEG bytes（Content-Disposition: attachment）"),
        (status = 400, description = "缺少上传文件或 multipart 格式错误", body = LegacyErrorBody),
        (status = 413, description = "上传文件过大", body = ProblemDetails),
        (status = 415, description = "不支持的输入格式", body = ProblemDetails),
        (status = 422, description = "图片解码失败", body = ProblemDetails),
        (status = 500, description = "内部错误", body = ProblemDetails)
    ),
    tag = "Convert"
)]
pub async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ConvertedFile, AppError> {
    // 非 multipart 请求与缺少 file 字段同等处理
    let multipart = multipart.map_err(|e| {
        tracing::debug!("请求不是有效的 multipart 表单: {}", e);
        AppError::MissingFile
    })?;

    let upload = read_upload(multipart).await?;
    tracing::info!(
        "收到上传: {:?} ({} bytes)",
        upload.client_filename,
        upload.bytes.len()
    );

    state.converter.convert(upload).await
}

/// 取第一个带文件名的 `file` 字段，其余字段直接跳过
async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // 没有 filename 的同名字段是普通表单值，不算上传文件
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if filename.trim().is_empty() {
            return Err(AppError::MissingFile);
        }
        let bytes = field.bytes().await?;
        return Ok(UploadedFile::new(filename, bytes));
    }
    Err(AppError::MissingFile)
}

/// 创建转换路由（请求体上限作用于 multipart 读取）
pub fn create_convert_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/convert", post(convert))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

