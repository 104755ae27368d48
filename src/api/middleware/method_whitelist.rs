//! HTTP 方法白名单
//!
//! 桥接服务只有 GET（健康检查）和 POST（调用）两类接口，其余方法一律 405。

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

pub fn is_allowed(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::POST)
}

pub async fn method_whitelist_middleware(req: Request, next: Next) -> Result<Response, StatusCode> {
    if is_allowed(req.method()) {
        return Ok(next.run(req).await);
    }
    warn!(method = %req.method(), path = %req.uri().path(), "http_method_blocked");
    Err(StatusCode::METHOD_NOT_ALLOWED)
}
