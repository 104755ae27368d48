use axum::Json;
use serde::{Deserialize, Serialize};

use crate::{
    api::response::{success_response, ApiResponse},
    error::AppError,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Healthz {
    pub status: String,
    pub version: String,
}

/// 健康检查不触碰会话锁（对话框打开时锁会被长时间持有）
pub async fn healthz() -> Result<Json<ApiResponse<Healthz>>, AppError> {
    let version = format!(
        "{}+{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("dev")
    );
    success_response(Healthz {
        status: "ok".into(),
        version,
    })
}
