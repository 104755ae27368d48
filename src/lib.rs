//! IronRecover - 钱包恢复编排
//!
//! 不可信的表现层进程收集表单、解析密钥标识、组装恢复请求；
//! 特权进程（host）独占会话状态、本地派生、coin SDK、对话框与文件写入。
//! 两者之间只有一个封闭的命令/查询桥。

pub mod api;
pub mod app_state;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        bridge::{BridgeCall, BridgeClient, BridgeError, BridgeReply, BridgeTransport},
        domain::{CoinId, CoinRegistry, Environment, RecoveryResult, WalletType},
        error::{AppError, AppErrorCode},
        service::{
            parameter_builder::FormValues,
            recovery_executor::{CrossChainAttempt, RecoveryAttempt, RecoveryExecutor},
        },
    };
}
