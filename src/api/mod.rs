use std::{sync::Arc, time::Instant};

use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    api::middleware::{method_whitelist_middleware, trace_id_middleware, TraceId},
    app_state::AppState,
    bridge::http::INVOKE_PATH,
};

pub mod bridge_api;
pub mod handlers;
pub mod middleware;
pub mod response;

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(INVOKE_PATH, post(bridge_api::invoke))
        .route("/healthz", get(handlers::healthz))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(method_whitelist_middleware))
                .layer(from_fn(trace_id_middleware))
                .layer(from_fn(trace_log)),
        )
        .with_state(state)
}

async fn trace_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "-".to_string());
    let start = Instant::now();
    let resp = next.run(req).await;
    tracing::info!(
        trace_id = %trace_id,
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "http_request"
    );
    resp
}
