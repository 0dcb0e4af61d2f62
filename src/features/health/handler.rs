use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::config::StorageMode;
use crate::state::AppState;

/// 探活结果
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` 或 `degraded`
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "convert-backend")]
    pub service: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 上传落盘方式
    #[schema(value_type = String, example = "content_addressed")]
    pub storage_mode: StorageMode,
    /// 上传目录是否存在且为目录
    pub upload_dir_ready: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "返回服务版本与上传目录状态；上传目录不可用时返回 503。",
    responses(
        (status = 200, description = "服务健康", body = HealthResponse),
        (status = 503, description = "上传目录不可用", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = state.converter.store();
    let ready = tokio::fs::metadata(store.root())
        .await
        .is_ok_and(|m| m.is_dir());

    let (code, status) = if ready {
        (StatusCode::OK, "healthy")
    } else {
        tracing::warn!("上传目录不可用: {:?}", store.root());
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage_mode: store.mode(),
            upload_dir_ready: ready,
        }),
    )
}
