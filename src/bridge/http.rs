//! HTTP 桥接传输（reqwest → 特权进程的本机端点）

use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::{
    client::BridgeTransport,
    operation::BridgeCall,
    reply::{BridgeError, BridgeReply},
};

/// 特权进程的调用路径
pub const INVOKE_PATH: &str = "/api/v1/bridge/invoke";

pub struct HttpBridgeTransport {
    client: reqwest::Client,
    invoke_url: String,
}

impl HttpBridgeTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::transport("connect", format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            client,
            invoke_url: format!("{}{}", base_url.trim_end_matches('/'), INVOKE_PATH),
        })
    }

    pub fn invoke_url(&self) -> &str {
        &self.invoke_url
    }
}

#[async_trait]
impl BridgeTransport for HttpBridgeTransport {
    async fn invoke(&self, call: BridgeCall) -> BridgeReply {
        let operation = call.name();
        tracing::debug!(operation, url = %self.invoke_url, "bridge_http_invoke");

        let response = match self.client.post(&self.invoke_url).json(&call).send().await {
            Ok(response) => response,
            Err(e) => {
                return BridgeError::transport(operation, format!("request failed: {}", e)).into();
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation, status = %status, "bridge_http_status");
            return BridgeError::transport(operation, format!("HTTP {}: {}", status, body)).into();
        }

        match response.json::<BridgeReply>().await {
            Ok(reply) => reply,
            Err(e) => BridgeError::protocol(operation, format!("undecodable reply: {}", e)).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::reply::BridgeErrorKind;

    #[test]
    fn test_invoke_url_joins_base() {
        let transport = HttpBridgeTransport::new("http://127.0.0.1:8787/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.invoke_url(), "http://127.0.0.1:8787/api/v1/bridge/invoke");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // 端口 9 (discard) 在测试环境中不会有监听者
        let transport = HttpBridgeTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let reply = transport.invoke(BridgeCall::GetVersion).await;
        match reply {
            BridgeReply::Error { error } => {
                assert_eq!(error.kind, BridgeErrorKind::Transport);
                assert_eq!(error.operation, "getVersion");
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
