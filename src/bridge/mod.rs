//! 命令/查询桥
//!
//! 不可信的表现层进程与特权进程之间唯一的通道。

pub mod client;
pub mod http;
pub mod local;
pub mod operation;
pub mod reply;

pub use client::{BridgeClient, BridgeTransport};
pub use http::HttpBridgeTransport;
pub use local::LocalBridgeTransport;
pub use operation::{AuthStatus, BridgeCall, Identity, OperationKind, SeedDerivation, TextEncoding};
pub use reply::{BridgeError, BridgeErrorKind, BridgeReply};
