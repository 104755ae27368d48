//! 进程内桥接传输（测试与单进程模式）

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    bridge::{client::BridgeTransport, operation::BridgeCall, reply::BridgeReply},
    service::privileged_host::PrivilegedHost,
};

pub struct LocalBridgeTransport {
    host: Arc<PrivilegedHost>,
}

impl LocalBridgeTransport {
    pub fn new(host: Arc<PrivilegedHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl BridgeTransport for LocalBridgeTransport {
    async fn invoke(&self, call: BridgeCall) -> BridgeReply {
        self.host.dispatch(call).await
    }
}
