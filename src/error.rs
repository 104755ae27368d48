use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    bridge::{BridgeError, BridgeErrorKind},
    domain::coin::CoinError,
    infrastructure::log_redact::scrub_key_material,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    BadRequest,
    Internal,

    // 恢复流程错误码
    Configuration,
    ValidationFailed,
    Derivation,
    Bridge,
    Recovery,
    UnexpectedResultShape,
    UserDeclined,
    AttemptInProgress,
    Abandoned,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::Internal => "internal",
            AppErrorCode::Configuration => "configuration",
            AppErrorCode::ValidationFailed => "validation_failed",
            AppErrorCode::Derivation => "derivation",
            AppErrorCode::Bridge => "bridge",
            AppErrorCode::Recovery => "recovery",
            AppErrorCode::UnexpectedResultShape => "unexpected_result_shape",
            AppErrorCode::UserDeclined => "user_declined",
            AppErrorCode::AttemptInProgress => "attempt_in_progress",
            AppErrorCode::Abandoned => "abandoned",
        }
    }
}

/// 单个表单字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub field_errors: Vec<FieldError>,
    pub trace_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "<[FieldError]>::is_empty")]
    field_errors: &'a [FieldError],
    trace_id: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
            field_errors: &self.field_errors,
            trace_id: self.trace_id.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// 所有构造函数都经过这里：消息里形似密钥的内容会被抹掉
    fn with_code(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: scrub_key_material(&msg.into()),
            status,
            field_errors: Vec::new(),
            trace_id: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::BadRequest, StatusCode::BAD_REQUEST, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::Configuration, StatusCode::BAD_REQUEST, msg)
    }

    /// 一次性报告所有字段错误
    pub fn validation_failed(field_errors: Vec<FieldError>) -> Self {
        let fields: Vec<&str> = field_errors.iter().map(|e| e.field.as_str()).collect();
        let mut err = Self::with_code(
            AppErrorCode::ValidationFailed,
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid fields: {}", fields.join(", ")),
        );
        err.field_errors = field_errors
            .into_iter()
            .map(|e| FieldError::new(e.field, scrub_key_material(&e.message)))
            .collect();
        err
    }

    pub fn derivation(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::Derivation, StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn bridge(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::Bridge, StatusCode::BAD_GATEWAY, msg)
    }

    pub fn recovery(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::Recovery, StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn unexpected_result_shape(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::UnexpectedResultShape, StatusCode::BAD_GATEWAY, msg)
    }

    pub fn user_declined(msg: impl Into<String>) -> Self {
        Self::with_code(AppErrorCode::UserDeclined, StatusCode::BAD_REQUEST, msg)
    }

    pub fn attempt_in_progress() -> Self {
        Self::with_code(
            AppErrorCode::AttemptInProgress,
            StatusCode::CONFLICT,
            "A recovery attempt is already in progress",
        )
    }

    pub fn abandoned() -> Self {
        Self::with_code(
            AppErrorCode::Abandoned,
            StatusCode::GONE,
            "The recovery attempt was abandoned",
        )
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// 是否属于用户主动放弃（不记为故障）
    pub fn is_user_declined(&self) -> bool {
        self.code == AppErrorCode::UserDeclined
    }

    /// 展示给操作员的一行消息
    pub fn user_message(&self) -> String {
        match self.code {
            AppErrorCode::ValidationFailed if !self.field_errors.is_empty() => {
                let details: Vec<String> = self
                    .field_errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                format!("Please correct the form. {}", details.join("; "))
            }
            AppErrorCode::UserDeclined => "No file path selected".to_string(),
            AppErrorCode::UnexpectedResultShape => format!(
                "The recovery service returned a result that is not a recovery transaction. {}",
                self.message
            ),
            AppErrorCode::Internal => "Internal error, please try again".to_string(),
            _ => self.message.clone(),
        }
    }
}

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        let message = err.to_string();
        match err.kind {
            BridgeErrorKind::Derivation => Self::derivation(message),
            BridgeErrorKind::Recovery => Self::recovery(message),
            // SDK 超时或退出按发起的操作归类
            BridgeErrorKind::Sdk => match err.operation.as_str() {
                "deriveBySeed" | "deriveByPath" => Self::derivation(message),
                "setEnvironment" => Self::configuration(message),
                "recover" | "crossChainRecover" => Self::recovery(message),
                _ => Self::bridge(message),
            },
            BridgeErrorKind::Configuration => Self::configuration(message),
            BridgeErrorKind::Precondition
            | BridgeErrorKind::UnknownOperation
            | BridgeErrorKind::InvalidArgument
            | BridgeErrorKind::Authentication
            | BridgeErrorKind::Persistence
            | BridgeErrorKind::Dialog
            | BridgeErrorKind::Transport
            | BridgeErrorKind::Protocol => Self::bridge(message),
        }
    }
}

impl From<CoinError> for AppError {
    fn from(err: CoinError) -> Self {
        Self::configuration(err.to_string())
    }
}

// 从 serde_json 错误转换
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("JSON serialization error: {}", err))
    }
}

// 从 anyhow 错误转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{}", err))
    }
}
