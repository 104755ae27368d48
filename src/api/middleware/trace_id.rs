//! Trace ID 中间件
//! 为每个请求生成或沿用 trace_id，写入请求扩展与响应头

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// 请求扩展中的 trace_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    /// 优先沿用请求头里的值
    pub fn from_request(req: &Request) -> Self {
        req.headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty() && value.len() <= 64)
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(|| Self(Uuid::new_v4().to_string()))
    }
}

pub async fn trace_id_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = TraceId::from_request(&req);
    req.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id.0) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
