use axum::{
    body::Body,
    http::{Request, header},
};
use tower::ServiceExt;

use convert_backend::config::CorsConfig;
use convert_backend::{AppConfig, AppState, build_router};

fn app_with_cors(cors: CorsConfig) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::default();
    config.storage.upload_dir = dir.path().to_string_lossy().into_owned();
    config.cors = cors;
    let app = build_router(&config, AppState::from_config(&config));
    (app, dir)
}

#[tokio::test]
async fn cors_preflight_on_convert_allows_configured_origin() {
    let (app, _dir) = app_with_cors(CorsConfig {
        enabled: true,
        allowed_origins: vec!["https://example.com".to_string()],
        allowed_methods: vec!["post".to_string()],
        max_age_secs: Some(600),
    });

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/convert")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");

    let headers = resp.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("missing allow origin"),
        "https://example.com"
    );
    let allow_methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .expect("missing allow methods")
        .to_str()
        .expect("invalid allow methods");
    assert!(allow_methods.contains("POST"));
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_MAX_AGE)
            .expect("missing max age"),
        "600"
    );
}

#[tokio::test]
async fn cors_disabled_by_default() {
    let (app, _dir) = app_with_cors(CorsConfig::default());

    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");

    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
