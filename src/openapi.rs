use utoipa::OpenApi;
use utoipa::openapi::server::ServerBuilder;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::convert::handler::convert,
    ),
    components(
        schemas(
            crate::error::ProblemDetails,
            crate::error::LegacyErrorBody,
            crate::features::health::HealthResponse,
            crate::features::convert::ConvertUpload,
        )
    ),
    tags(
        (name = "Convert", description = "图片格式转换：PNG → JPEG。"),
        (name = "Health", description = "健康检查。"),
    ),
    info(
        title = "Convert Backend API",
        version = "0.1.0",
        description = "PNG to JPEG conversion service (Axum)"
    )
)]
pub struct ApiDoc;

/// 生成 OpenAPI 文档；业务接口挂在前缀下时补充 Servers，便于 Swagger UI 直接调试。
pub fn api_doc(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let prefix = api_prefix.trim_end_matches('/');
    if !prefix.is_empty() {
        let api = ServerBuilder::new()
            .url(prefix)
            .description(Some("业务接口（config.api.prefix）"))
            .build();
        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health）"))
            .build();
        doc.servers = Some(vec![api, root]);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_contains_convert_and_health_paths() {
        let doc = api_doc("");
        assert!(doc.paths.paths.contains_key("/convert"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.servers.is_none());
    }

    #[test]
    fn prefixed_api_exposes_servers() {
        let doc = api_doc("/api/v1/");
        let servers = doc.servers.expect("servers");
        assert_eq!(servers[0].url, "/api/v1");
        assert_eq!(servers[1].url, "/");
    }
}
