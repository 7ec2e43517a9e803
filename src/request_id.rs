use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// 请求追踪头
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// 请求扩展中的 request_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

tokio::task_local! {
    // 供 AppError::into_response 回填 ProblemDetails.requestId
    static CURRENT: String;
}

/// 当前请求任务绑定的 request_id（中间件之外调用时为 None）
pub fn current_request_id() -> Option<String> {
    CURRENT.try_with(|v| v.clone()).ok()
}

fn accept_client_id(raw: &str) -> Option<&str> {
    let v = raw.trim();
    let safe = !v.is_empty()
        && v.len() <= MAX_REQUEST_ID_LEN
        && v
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    safe.then_some(v)
}

/// 透传合法的 `X-Request-Id`，否则生成 `req_<uuid>`；写回响应头并注入 tracing span。
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(accept_client_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("req_{}", Uuid::new_v4().simple()));

    req.extensions_mut().insert(RequestId(id.clone()));
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut res = CURRENT
        .scope(id.clone(), next.run(req).instrument(span))
        .await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    res
}
