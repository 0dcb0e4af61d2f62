//! 请求追踪：`X-Request-Id` 解析、生成与回写
//!
//! 每个请求在一个带 `request_id` 字段的 tracing span 中执行，
//! 同时写入 task-local 供 ProblemDetails 使用。

use std::fmt;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// 请求追踪头
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_LEN: usize = 128;

/// 已校验的请求 ID：只含 `[A-Za-z0-9._-]`，长度 1-128
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// 从请求头读取客户端提供的 ID，缺失或不合法时返回 None
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(&REQUEST_ID_HEADER)?.to_str().ok()?.trim();
        Self::is_acceptable(raw).then(|| Self(raw.to_owned()))
    }

    /// 服务端生成：`req_<uuid simple>`
    pub fn generate() -> Self {
        Self(format!("req_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_acceptable(v: &str) -> bool {
        (1..=MAX_LEN).contains(&v.len())
            && v.bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static CURRENT: RequestId;
}

/// 当前请求的 ID；在中间件之外调用时为 None
pub fn current_request_id() -> Option<String> {
    CURRENT.try_with(|id| id.0.clone()).ok()
}

/// 全局中间件：透传或生成请求 ID，在对应 span 中执行后续处理，并写回响应头
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_headers(req.headers()).unwrap_or_else(RequestId::generate);
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(id.clone());

    let started = Instant::now();
    let mut res = CURRENT
        .scope(id.clone(), next.run(req))
        .instrument(span.clone())
        .await;
    span.in_scope(|| {
        tracing::debug!(
            status = res.status().as_u16(),
            "请求结束 ({}ms)",
            started.elapsed().as_millis()
        );
    });

    // 校验过的 ID 一定是合法的头部值
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn client_id_with_safe_chars_is_kept() {
        let id = RequestId::from_headers(&headers_with(" req-123_abc.def ")).expect("valid");
        assert_eq!(id.as_str(), "req-123_abc.def");
    }

    #[test]
    fn unsafe_empty_or_long_ids_are_rejected() {
        assert!(RequestId::from_headers(&HeaderMap::new()).is_none());
        let too_long = "a".repeat(MAX_LEN + 1);
        for bad in ["", "bad id", "bad/xx", too_long.as_str()] {
            assert!(RequestId::from_headers(&headers_with(bad)).is_none(), "{bad}");
        }
        assert!(RequestId::from_headers(&headers_with(&"a".repeat(MAX_LEN))).is_some());
    }

    #[test]
    fn generated_ids_are_unique_and_acceptable() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_"));
        assert!(RequestId::is_acceptable(a.as_str()));
    }

    #[tokio::test]
    async fn current_id_is_scoped_to_task() {
        assert_eq!(current_request_id(), None);
        let seen = CURRENT
            .scope(RequestId("req_scoped".to_owned()), async { current_request_id() })
            .await;
        assert_eq!(seen.as_deref(), Some("req_scoped"));
    }
}
