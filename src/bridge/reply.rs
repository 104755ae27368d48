//! 桥接应答
//!
//! 每个调用都返回 `BridgeReply`：要么是值，要么是带类别的错误。
//! 特权进程内部的错误对象不会原样越过边界。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 桥接错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BridgeErrorKind {
    /// 会话状态不满足（例如未设置环境）
    Precondition,
    UnknownOperation,
    InvalidArgument,
    Configuration,
    Derivation,
    Recovery,
    Authentication,
    Persistence,
    Dialog,
    Sdk,
    /// 不可信进程一侧：连接/HTTP 失败
    Transport,
    /// 应答无法解码
    Protocol,
}

impl BridgeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precondition => "precondition",
            Self::UnknownOperation => "unknown_operation",
            Self::InvalidArgument => "invalid_argument",
            Self::Configuration => "configuration",
            Self::Derivation => "derivation",
            Self::Recovery => "recovery",
            Self::Authentication => "authentication",
            Self::Persistence => "persistence",
            Self::Dialog => "dialog",
            Self::Sdk => "sdk",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
        }
    }
}

/// 结构化桥接错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{operation} failed ({}): {message}", .kind.as_str())]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub operation: String,
    pub message: String,
}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn precondition(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Precondition, operation, message)
    }

    pub fn invalid_argument(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::InvalidArgument, operation, message)
    }

    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Transport, operation, message)
    }

    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Protocol, operation, message)
    }
}

/// 桥接应答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BridgeReply {
    Ok { value: Value },
    Error { error: BridgeError },
}

impl BridgeReply {
    pub fn ok(value: impl Into<Value>) -> Self {
        Self::Ok {
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        Self::Ok { value: Value::Null }
    }

    pub fn into_result(self) -> Result<Value, BridgeError> {
        match self {
            Self::Ok { value } => Ok(value),
            Self::Error { error } => Err(error),
        }
    }
}

impl From<BridgeError> for BridgeReply {
    fn from(error: BridgeError) -> Self {
        Self::Error { error }
    }
}

impl From<Result<Value, BridgeError>> for BridgeReply {
    fn from(result: Result<Value, BridgeError>) -> Self {
        match result {
            Ok(value) => Self::Ok { value },
            Err(error) => Self::Error { error },
        }
    }
}
