//! 桥接 API
//!
//! `POST /api/v1/bridge/invoke`：请求体是 `BridgeCall` JSON，响应体永远是
//! `BridgeReply` JSON（HTTP 200）。请求体无法解析时同样返回结构化错误。

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::Value;

use crate::{
    api::middleware::TraceId,
    app_state::AppState,
    bridge::{BridgeError, BridgeReply},
};

pub async fn invoke(
    State(st): State<Arc<AppState>>,
    trace_id: Option<Extension<TraceId>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Json<BridgeReply> {
    let trace_id = trace_id.map(|Extension(id)| id.0).unwrap_or_default();

    let Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(trace_id = %trace_id, error = %rejection.body_text(), "bridge_body_rejected");
            return Json(
                BridgeError::invalid_argument("unknown", rejection.body_text()).into(),
            );
        }
    };

    let reply = st.host.dispatch_value(raw).await;
    if let BridgeReply::Error { error } = &reply {
        tracing::info!(
            trace_id = %trace_id,
            operation = %error.operation,
            kind = error.kind.as_str(),
            "bridge_invoke_failed"
        );
    }
    Json(reply)
}
