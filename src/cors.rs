use axum::http::{HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 根据配置构建 CORS 中间件（未启用或配置无效时返回 None）
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let (any_origin, origins) = parse_list(&cors.allowed_origins, "allowed_origins", |v| {
        HeaderValue::from_str(v).ok()
    });
    if !any_origin && origins.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let (any_method, methods) = parse_list(&cors.allowed_methods, "allowed_methods", |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });

    let mut layer = CorsLayer::new();
    layer = if any_origin {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    };
    if any_method {
        layer = layer.allow_methods(Any);
    } else if !methods.is_empty() {
        layer = layer.allow_methods(methods);
    }
    // 上传表单由浏览器自动设置 Content-Type
    layer = layer.allow_headers(Any);

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

/// 解析配置列表："*" 表示任意，无法解析的项告警后忽略
fn parse_list<T>(
    values: &[String],
    field: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> (bool, Vec<T>) {
    let mut any = false;
    let mut parsed = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            any = true;
            continue;
        }
        match parse(value) {
            Some(v) => parsed.push(v),
            None => tracing::warn!("CORS {} 中存在无效项，已忽略: {}", field, value),
        }
    }
    (any, parsed)
}
