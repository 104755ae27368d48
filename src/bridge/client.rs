//! 不可信进程一侧的桥接客户端
//!
//! `BridgeTransport` 只负责把 `BridgeCall` 送到特权进程；
//! `BridgeClient` 在其上提供强类型方法并解码返回值。

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    bridge::{
        operation::{AuthStatus, BridgeCall, Identity, SeedDerivation, TextEncoding},
        reply::{BridgeError, BridgeReply},
    },
    domain::{CrossChainParams, Environment, PromptSpec, RecoverParams, SecretString},
};

/// 桥接传输层
///
/// 返回值是 `BridgeReply` 而不是 `Result`：连接失败也必须被编码成
/// 结构化错误（`Transport` 类别）。
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    async fn invoke(&self, call: BridgeCall) -> BridgeReply;
}

/// 强类型桥接客户端
#[derive(Clone)]
pub struct BridgeClient {
    transport: Arc<dyn BridgeTransport>,
}

impl BridgeClient {
    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self { transport }
    }

    async fn call(&self, call: BridgeCall) -> Result<Value, BridgeError> {
        self.transport.invoke(call).await.into_result()
    }

    async fn call_typed<T: DeserializeOwned>(&self, call: BridgeCall) -> Result<T, BridgeError> {
        let operation = call.name();
        let value = self.call(call).await?;
        serde_json::from_value(value).map_err(|e| {
            BridgeError::protocol(operation, format!("unexpected reply payload: {}", e))
        })
    }

    async fn call_unit(&self, call: BridgeCall) -> Result<(), BridgeError> {
        self.call(call).await.map(|_| ())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Commands
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn set_environment(
        &self,
        environment: Environment,
        coin: Option<&str>,
        api_key: Option<SecretString>,
    ) -> Result<(), BridgeError> {
        self.call_unit(BridgeCall::SetEnvironment {
            environment,
            coin: coin.map(str::to_string),
            api_key,
        })
        .await
    }

    pub async fn derive_by_path(&self, key: SecretString, path: &str) -> Result<SecretString, BridgeError> {
        self.call_typed(BridgeCall::DeriveByPath {
            key,
            path: path.to_string(),
        })
        .await
    }

    pub async fn derive_by_seed(
        &self,
        coin: &str,
        key: SecretString,
        seed: SecretString,
    ) -> Result<SeedDerivation, BridgeError> {
        self.call_typed(BridgeCall::DeriveBySeed {
            coin: coin.to_string(),
            key,
            seed,
        })
        .await
    }

    /// 返回 SDK 的原始结果，由调用方分类
    pub async fn recover(&self, coin: &str, params: RecoverParams) -> Result<Value, BridgeError> {
        self.call(BridgeCall::Recover {
            coin: coin.to_string(),
            params,
        })
        .await
    }

    pub async fn cross_chain_recover(
        &self,
        source_coin: &str,
        destination_coin: &str,
        params: CrossChainParams,
    ) -> Result<Value, BridgeError> {
        self.call(BridgeCall::CrossChainRecover {
            source_coin: source_coin.to_string(),
            destination_coin: destination_coin.to_string(),
            params,
        })
        .await
    }

    pub async fn persist(&self, path: &str, content: String) -> Result<(), BridgeError> {
        self.call_unit(BridgeCall::Persist {
            path: path.to_string(),
            content,
            encoding: TextEncoding::Utf8,
        })
        .await
    }

    /// 阻塞式选择框，返回按钮下标
    pub async fn prompt_choice(&self, prompt: PromptSpec) -> Result<usize, BridgeError> {
        self.call_typed(BridgeCall::PromptChoice(prompt)).await
    }

    /// 用户取消时返回 `None`
    pub async fn choose_save_destination(
        &self,
        default_path: &str,
        extensions: &[&str],
    ) -> Result<Option<String>, BridgeError> {
        self.call_typed(BridgeCall::ChooseSaveDestination {
            default_path: default_path.to_string(),
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        })
        .await
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: SecretString,
        otp: SecretString,
    ) -> Result<Identity, BridgeError> {
        self.call_typed(BridgeCall::Authenticate {
            username: username.to_string(),
            password,
            otp,
        })
        .await
    }

    pub async fn end_session(&self) -> Result<(), BridgeError> {
        self.call_unit(BridgeCall::EndSession).await
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn version(&self) -> Result<String, BridgeError> {
        self.call_typed(BridgeCall::GetVersion).await
    }

    pub async fn chain_id(&self, coin: &str) -> Result<String, BridgeError> {
        self.call_typed(BridgeCall::GetChainId {
            coin: coin.to_string(),
        })
        .await
    }

    pub async fn identity(&self) -> Result<Identity, BridgeError> {
        self.call_typed(BridgeCall::GetIdentity).await
    }

    pub async fn auth_status(&self) -> Result<AuthStatus, BridgeError> {
        self.call_typed(BridgeCall::GetAuthStatus).await
    }
}
