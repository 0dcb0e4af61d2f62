use axum::{Router, routing::get};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::features::{convert, health};
use crate::openapi::api_doc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整路由：业务接口、健康检查、文档与全局中间件
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    let api_router = Router::<AppState>::new()
        .merge(convert::create_convert_router(config.storage.max_upload_bytes));

    let prefix = config.api.prefix.trim_end_matches('/');
    let mut app = Router::<AppState>::new().route("/health", get(health::health_check));
    // 前缀为空时直接挂在根路径（与旧接口 `/convert` 保持一致）
    app = if prefix.is_empty() {
        app.merge(api_router)
    } else {
        app.nest(prefix, api_router)
    };

    let mut app = app
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api_doc(prefix)))
        .with_state(state);

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    // request_id 放在最外层，CORS 预检等响应同样带上追踪头
    app.layer(axum::middleware::from_fn(request_id_middleware))
}
