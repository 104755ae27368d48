//! 特权进程：桥接调用的唯一执行者
//!
//! 会话状态（环境绑定、登录身份）只存在于这里。所有调用在同一把
//! 异步锁下串行执行，包括会阻塞等待用户的对话框。

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::{
    bridge::{
        AuthStatus, BridgeCall, BridgeError, BridgeErrorKind, BridgeReply, Identity,
        SeedDerivation,
    },
    domain::{
        CoinId, CoinRegistry, CrossChainParams, CurveType, Environment, PromptSpec, RecoverParams,
        RecoveryRequest, SecretString,
    },
    infrastructure::log_redact::{scrub_key_material, SensitiveRedact},
    service::{
        coin_sdk::{CoinSdk, SdkError, SdkMethod},
        dialogs::DialogProvider,
        key_derivation::KeyDeriver,
        output_store::OutputStore,
    },
};

/// 当前环境绑定
#[derive(Debug, Clone)]
pub struct EnvironmentBinding {
    pub environment: Environment,
    /// 绑定到单一币种时，其它币种的调用被拒绝
    pub coin: Option<CoinId>,
    pub has_api_key: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    binding: Option<EnvironmentBinding>,
    identity: Option<Identity>,
}

pub struct PrivilegedHost {
    session: Mutex<SessionState>,
    sdk: Arc<dyn CoinSdk>,
    dialogs: Arc<dyn DialogProvider>,
    store: OutputStore,
    deriver: KeyDeriver,
}

fn to_value<T: Serialize>(operation: &str, value: &T) -> Result<Value, BridgeError> {
    serde_json::to_value(value)
        .map_err(|e| BridgeError::protocol(operation, format!("failed to encode reply: {}", e)))
}

/// SDK 声明的失败归入 `remote_kind`，其余（超时、进程退出）归入 Sdk
fn sdk_error(operation: &str, remote_kind: BridgeErrorKind, err: SdkError) -> BridgeError {
    let kind = match err {
        SdkError::Remote(_) => remote_kind,
        _ => BridgeErrorKind::Sdk,
    };
    BridgeError::new(kind, operation, scrub_key_material(&err.to_string()))
}

impl PrivilegedHost {
    pub fn new(sdk: Arc<dyn CoinSdk>, dialogs: Arc<dyn DialogProvider>) -> Self {
        Self {
            session: Mutex::new(SessionState::default()),
            sdk,
            dialogs,
            store: OutputStore::new(),
            deriver: KeyDeriver::new(),
        }
    }

    /// 当前环境绑定（无则为 None）
    pub async fn binding(&self) -> Option<EnvironmentBinding> {
        self.session.lock().await.binding.clone()
    }

    /// 执行一次桥接调用
    pub async fn dispatch(&self, call: BridgeCall) -> BridgeReply {
        let operation = call.name();
        tracing::info!(
            operation,
            kind = ?call.kind(),
            call = %call.redact(),
            "bridge_call"
        );

        let mut session = self.session.lock().await;
        let result = self.handle(&mut session, call).await;
        drop(session);

        match &result {
            Ok(_) => tracing::debug!(operation, "bridge_call_ok"),
            Err(e) => tracing::warn!(
                operation,
                kind = e.kind.as_str(),
                error = %e.message,
                "bridge_call_failed"
            ),
        }
        result.into()
    }

    /// 解码未信任的 JSON 再执行
    ///
    /// 未知操作名与已知操作的参数错误分别报告。
    pub async fn dispatch_value(&self, raw: Value) -> BridgeReply {
        let Some(name) = raw.get("operation").and_then(Value::as_str).map(str::to_string) else {
            return BridgeError::invalid_argument("unknown", "missing 'operation' field").into();
        };

        if !BridgeCall::is_known_operation(&name) {
            tracing::warn!(operation = %name, "bridge_unknown_operation");
            return BridgeError::new(
                BridgeErrorKind::UnknownOperation,
                name,
                "operation is not supported",
            )
            .into();
        }

        match serde_json::from_value::<BridgeCall>(raw) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => {
                BridgeError::invalid_argument(name, scrub_key_material(&e.to_string())).into()
            }
        }
    }

    async fn handle(&self, session: &mut SessionState, call: BridgeCall) -> Result<Value, BridgeError> {
        let operation = call.name();
        match call {
            BridgeCall::SetEnvironment {
                environment,
                coin,
                api_key,
            } => {
                self.set_environment(session, environment, coin.as_deref(), api_key)
                    .await
            }
            BridgeCall::DeriveByPath { key, path } => {
                Self::require_binding(session, operation)?;
                let derived = self
                    .deriver
                    .derive_by_path(&key, &path)
                    .map_err(|e| BridgeError::new(BridgeErrorKind::Derivation, operation, e.to_string()))?;
                Ok(json!(derived.expose()))
            }
            BridgeCall::DeriveBySeed { coin, key, seed } => {
                let binding = Self::require_binding(session, operation)?;
                let coin = Self::resolve_coin(binding, operation, &coin)?;
                self.derive_by_seed(operation, &coin, key, seed).await
            }
            BridgeCall::Recover { coin, params } => {
                let binding = Self::require_binding(session, operation)?;
                let coin = Self::resolve_coin(binding, operation, &coin)?;
                self.recover(operation, &coin, params).await
            }
            BridgeCall::CrossChainRecover {
                source_coin,
                destination_coin,
                params,
            } => {
                let binding = Self::require_binding(session, operation)?;
                let source = Self::resolve_coin(binding, operation, &source_coin)?;
                let destination = CoinRegistry::resolve(&destination_coin, binding.environment)
                    .map_err(|e| BridgeError::new(BridgeErrorKind::Configuration, operation, e.to_string()))?;
                self.cross_chain_recover(operation, &source, &destination, params)
                    .await
            }
            BridgeCall::Persist {
                path,
                content,
                encoding,
            } => {
                self.store
                    .write_text(&path, &content, encoding)
                    .await
                    .map_err(|e| BridgeError::new(BridgeErrorKind::Persistence, operation, e.to_string()))?;
                Ok(Value::Null)
            }
            BridgeCall::PromptChoice(prompt) => self.prompt_choice(operation, &prompt).await,
            BridgeCall::ChooseSaveDestination {
                default_path,
                extensions,
            } => {
                let chosen = self
                    .dialogs
                    .save_destination(&default_path, &extensions)
                    .await
                    .map_err(|e| BridgeError::new(BridgeErrorKind::Dialog, operation, e.to_string()))?;
                Ok(chosen.map(Value::String).unwrap_or(Value::Null))
            }
            BridgeCall::Authenticate {
                username,
                password,
                otp,
            } => {
                let value = self
                    .sdk
                    .call(
                        SdkMethod::Login,
                        json!({
                            "username": username,
                            "password": password.expose(),
                            "otp": otp.expose(),
                        }),
                    )
                    .await
                    .map_err(|e| sdk_error(operation, BridgeErrorKind::Authentication, e))?;
                let identity: Identity = serde_json::from_value(value).map_err(|e| {
                    BridgeError::new(
                        BridgeErrorKind::Authentication,
                        operation,
                        format!("unexpected login response: {}", e),
                    )
                })?;
                tracing::info!(username = %identity.username, "session_authenticated");
                session.identity = Some(identity.clone());
                to_value(operation, &identity)
            }
            BridgeCall::EndSession => {
                self.sdk
                    .call(SdkMethod::Logout, json!({}))
                    .await
                    .map_err(|e| sdk_error(operation, BridgeErrorKind::Authentication, e))?;
                session.identity = None;
                tracing::info!("session_ended");
                Ok(Value::Null)
            }
            BridgeCall::GetVersion => Ok(json!(env!("CARGO_PKG_VERSION"))),
            BridgeCall::GetChainId { coin } => {
                let coin = match &session.binding {
                    Some(binding) => CoinRegistry::resolve(&coin, binding.environment),
                    None => CoinRegistry::lookup(&coin),
                }
                .map_err(|e| BridgeError::new(BridgeErrorKind::Configuration, operation, e.to_string()))?;
                Ok(json!(coin.spec().chain))
            }
            BridgeCall::GetIdentity => {
                if let Some(identity) = &session.identity {
                    return to_value(operation, identity);
                }
                let value = self
                    .sdk
                    .call(SdkMethod::GetUser, json!({}))
                    .await
                    .map_err(|e| sdk_error(operation, BridgeErrorKind::Authentication, e))?;
                if value.is_null() {
                    return Err(BridgeError::new(
                        BridgeErrorKind::Authentication,
                        operation,
                        "not authenticated",
                    ));
                }
                let identity: Identity = serde_json::from_value(value).map_err(|e| {
                    BridgeError::new(
                        BridgeErrorKind::Authentication,
                        operation,
                        format!("unexpected user payload: {}", e),
                    )
                })?;
                session.identity = Some(identity.clone());
                to_value(operation, &identity)
            }
            BridgeCall::GetAuthStatus => to_value(
                operation,
                &AuthStatus {
                    authenticated: session.identity.is_some(),
                },
            ),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 会话前置条件
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn require_binding<'a>(
        session: &'a SessionState,
        operation: &str,
    ) -> Result<&'a EnvironmentBinding, BridgeError> {
        session.binding.as_ref().ok_or_else(|| {
            BridgeError::precondition(operation, "environment is not set; call setEnvironment first")
        })
    }

    fn resolve_coin(
        binding: &EnvironmentBinding,
        operation: &str,
        coin: &str,
    ) -> Result<CoinId, BridgeError> {
        let coin = CoinRegistry::resolve(coin, binding.environment)
            .map_err(|e| BridgeError::new(BridgeErrorKind::Configuration, operation, e.to_string()))?;
        if let Some(bound) = &binding.coin {
            if bound != &coin {
                return Err(BridgeError::precondition(
                    operation,
                    format!("session is bound to coin {}, not {}", bound, coin),
                ));
            }
        }
        Ok(coin)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Commands
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn set_environment(
        &self,
        session: &mut SessionState,
        environment: Environment,
        coin: Option<&str>,
        api_key: Option<SecretString>,
    ) -> Result<Value, BridgeError> {
        let operation = "setEnvironment";
        // 重新配置期间会话视为未配置，成功后才写回绑定
        let previous = session.binding.take();
        let configured = self
            .configure_sdk(operation, environment, coin, api_key.as_ref())
            .await;
        let coin = match configured {
            Ok(coin) => coin,
            Err(e) => {
                session.identity = None;
                tracing::warn!(environment = %environment, "environment_reset_after_failure");
                return Err(e);
            }
        };

        let changed = previous
            .as_ref()
            .map(|binding| binding.environment != environment)
            .unwrap_or(false);
        if changed {
            // 新环境下旧的登录身份无效
            session.identity = None;
        }

        tracing::info!(
            environment = %environment,
            coin = coin.as_ref().map(CoinId::as_str).unwrap_or("*"),
            "environment_configured"
        );
        session.binding = Some(EnvironmentBinding {
            environment,
            coin,
            has_api_key: api_key.is_some(),
        });
        Ok(Value::Null)
    }

    async fn configure_sdk(
        &self,
        operation: &str,
        environment: Environment,
        coin: Option<&str>,
        api_key: Option<&SecretString>,
    ) -> Result<Option<CoinId>, BridgeError> {
        let coin = coin
            .map(|coin| CoinRegistry::resolve(coin, environment))
            .transpose()
            .map_err(|e| BridgeError::new(BridgeErrorKind::Configuration, operation, e.to_string()))?;

        self.sdk
            .call(
                SdkMethod::Configure,
                json!({
                    "env": environment.as_str(),
                    "coin": coin.as_ref().map(CoinId::as_str),
                    "apiKey": api_key.map(SecretString::expose),
                }),
            )
            .await
            .map_err(|e| sdk_error(operation, BridgeErrorKind::Configuration, e))?;
        Ok(coin)
    }

    async fn derive_by_seed(
        &self,
        operation: &str,
        coin: &CoinId,
        key: SecretString,
        seed: SecretString,
    ) -> Result<Value, BridgeError> {
        let derivation = match coin.spec().curve {
            CurveType::Secp256k1 => {
                let (key, derivation_path) = self
                    .deriver
                    .derive_by_seed(&key, &seed)
                    .map_err(|e| BridgeError::new(BridgeErrorKind::Derivation, operation, e.to_string()))?;
                SeedDerivation {
                    key,
                    derivation_path,
                }
            }
            CurveType::Ed25519 => {
                let value = self
                    .sdk
                    .call(
                        SdkMethod::DeriveKeyWithSeed,
                        json!({
                            "coin": coin.as_str(),
                            "key": key.expose(),
                            "seed": seed.expose(),
                        }),
                    )
                    .await
                    .map_err(|e| sdk_error(operation, BridgeErrorKind::Derivation, e))?;
                serde_json::from_value(value).map_err(|e| {
                    BridgeError::new(
                        BridgeErrorKind::Sdk,
                        operation,
                        format!("unexpected derivation payload: {}", e),
                    )
                })?
            }
        };

        tracing::info!(coin = %coin, path = %derivation.derivation_path, "key_derived_with_seed");
        to_value(operation, &derivation)
    }

    async fn recover(
        &self,
        operation: &str,
        coin: &CoinId,
        params: RecoverParams,
    ) -> Result<Value, BridgeError> {
        let request = RecoveryRequest::try_from(params)
            .map_err(|e| BridgeError::invalid_argument(operation, e.to_string()))?;
        request
            .check_coin(coin.spec())
            .map_err(|e| BridgeError::invalid_argument(operation, e.to_string()))?;

        tracing::info!(
            coin = %coin,
            extension = %request.extension.shape(),
            "recovery_invoked"
        );
        self.sdk
            .call(
                SdkMethod::Recover,
                json!({
                    "coin": coin.as_str(),
                    "params": request.to_params(),
                }),
            )
            .await
            .map_err(|e| sdk_error(operation, BridgeErrorKind::Recovery, e))
    }

    async fn cross_chain_recover(
        &self,
        operation: &str,
        source: &CoinId,
        destination: &CoinId,
        params: CrossChainParams,
    ) -> Result<Value, BridgeError> {
        if params.txid.trim().is_empty() {
            return Err(BridgeError::invalid_argument(operation, "txid is required"));
        }
        tracing::info!(
            source_coin = %source,
            destination_coin = %destination,
            signed = params.signed,
            "cross_chain_recovery_invoked"
        );
        self.sdk
            .call(
                SdkMethod::WrongChainRecover,
                json!({
                    "sourceCoin": source.as_str(),
                    "destinationCoin": destination.as_str(),
                    "params": params,
                }),
            )
            .await
            .map_err(|e| sdk_error(operation, BridgeErrorKind::Recovery, e))
    }

    async fn prompt_choice(&self, operation: &str, prompt: &PromptSpec) -> Result<Value, BridgeError> {
        if prompt.options.is_empty() {
            return Err(BridgeError::invalid_argument(operation, "prompt has no options"));
        }
        let index = self
            .dialogs
            .choose(prompt)
            .await
            .map_err(|e| BridgeError::new(BridgeErrorKind::Dialog, operation, e.to_string()))?;
        if index >= prompt.options.len() {
            return Err(BridgeError::new(
                BridgeErrorKind::Dialog,
                operation,
                format!("dialog returned index {} outside of {} options", index, prompt.options.len()),
            ));
        }
        Ok(json!(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::dialogs::DialogError;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct StubSdk {
        calls: StdMutex<Vec<(SdkMethod, Value)>>,
        /// 该方法的调用按超时处理
        timeout_on: StdMutex<Option<SdkMethod>>,
    }

    #[async_trait]
    impl CoinSdk for StubSdk {
        async fn call(&self, method: SdkMethod, params: Value) -> Result<Value, SdkError> {
            self.calls.lock().unwrap().push((method, params));
            if *self.timeout_on.lock().unwrap() == Some(method) {
                return Err(SdkError::Timeout(30));
            }
            match method {
                SdkMethod::Recover => Ok(json!({ "halfSigned": { "txHex": "0x01" } })),
                SdkMethod::Login => Ok(json!({ "id": "u1", "username": "ops" })),
                SdkMethod::DeriveKeyWithSeed => Ok(json!({ "key": "solkey", "derivationPath": "m/999999/1/2" })),
                _ => Ok(Value::Null),
            }
        }
    }

    struct FixedDialogs(usize);

    #[async_trait]
    impl DialogProvider for FixedDialogs {
        async fn choose(&self, _prompt: &PromptSpec) -> Result<usize, DialogError> {
            Ok(self.0)
        }

        async fn save_destination(
            &self,
            _default_path: &str,
            _extensions: &[String],
        ) -> Result<Option<String>, DialogError> {
            Ok(None)
        }
    }

    fn host(choice: usize) -> (PrivilegedHost, Arc<StubSdk>) {
        let sdk = Arc::new(StubSdk::default());
        (PrivilegedHost::new(sdk.clone(), Arc::new(FixedDialogs(choice))), sdk)
    }

    fn error_kind(reply: BridgeReply) -> BridgeErrorKind {
        match reply {
            BridgeReply::Error { error } => error.kind,
            other => panic!("expected error, got {:?}", other),
        }
    }

    fn set_env(coin: Option<&str>) -> BridgeCall {
        BridgeCall::SetEnvironment {
            environment: Environment::Test,
            coin: coin.map(str::to_string),
            api_key: Some("k".into()),
        }
    }

    #[tokio::test]
    async fn test_derivation_requires_environment() {
        let (host, _) = host(0);
        let reply = host
            .dispatch(BridgeCall::DeriveByPath {
                key: "xpub".into(),
                path: "m/0".to_string(),
            })
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_recover_requires_environment() {
        let (host, sdk) = host(0);
        let reply = host
            .dispatch(BridgeCall::Recover {
                coin: "tpolygon".to_string(),
                params: RecoverParams::default(),
            })
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Precondition);
        assert!(sdk.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_coin_bound_session_rejects_other_coin() {
        let (host, _) = host(0);
        assert!(matches!(host.dispatch(set_env(Some("tpolygon"))).await, BridgeReply::Ok { .. }));
        let reply = host
            .dispatch(BridgeCall::DeriveBySeed {
                coin: "tsol".to_string(),
                key: "k".into(),
                seed: "s".into(),
            })
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_wrong_environment_coin_is_configuration_error() {
        let (host, _) = host(0);
        let reply = host.dispatch(set_env(Some("polygon"))).await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Configuration);
        assert!(host.binding().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_reconfiguration_leaves_session_unconfigured() {
        let (host, _) = host(0);
        assert!(matches!(host.dispatch(set_env(Some("tsol"))).await, BridgeReply::Ok { .. }));
        host.dispatch(BridgeCall::Authenticate {
            username: "ops".to_string(),
            password: "pw".into(),
            otp: "000000".into(),
        })
        .await;

        let reply = host
            .dispatch(BridgeCall::SetEnvironment {
                environment: Environment::Prod,
                coin: Some("tsol".to_string()),
                api_key: None,
            })
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Configuration);
        assert!(host.binding().await.is_none());

        let reply = host
            .dispatch(BridgeCall::DeriveBySeed {
                coin: "tsol".to_string(),
                key: "k".into(),
                seed: "s".into(),
            })
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Precondition);

        let status = host.dispatch(BridgeCall::GetAuthStatus).await;
        assert!(matches!(
            status,
            BridgeReply::Ok { value } if value == json!({ "authenticated": false })
        ));
    }

    #[tokio::test]
    async fn test_sdk_configure_failure_clears_binding() {
        let (host, sdk) = host(0);
        assert!(matches!(host.dispatch(set_env(None)).await, BridgeReply::Ok { .. }));
        *sdk.timeout_on.lock().unwrap() = Some(SdkMethod::Configure);

        let reply = host.dispatch(set_env(Some("tpolygon"))).await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Sdk);
        assert!(host.binding().await.is_none());

        let reply = host
            .dispatch(BridgeCall::DeriveByPath {
                key: "xpub".into(),
                path: "m/0".to_string(),
            })
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_mixed_extensions_rejected_by_host() {
        let (host, sdk) = host(0);
        host.dispatch(set_env(None)).await;
        let raw = json!({
            "operation": "recover",
            "params": {
                "coin": "tpolygon",
                "params": {
                    "userKey": "U1",
                    "recoveryDestination": "0xdest",
                    "gasLimit": 500000,
                    "walletContractAddress": "0xabc",
                    "bitgoFeeAddress": "0xfee",
                    "eip1559": { "maxFeePerGas": 1, "maxPriorityFeePerGas": 1 },
                    "durableNonce": { "publicKey": "p", "secretKey": "s" }
                }
            }
        });
        let reply = host.dispatch_value(raw).await;
        assert_eq!(error_kind(reply), BridgeErrorKind::InvalidArgument);
        assert_eq!(sdk.calls.lock().unwrap().len(), 1); // 只有 configure
    }

    #[tokio::test]
    async fn test_unknown_operation_vs_invalid_arguments() {
        let (host, _) = host(0);
        let unknown = host.dispatch_value(json!({ "operation": "exportPrivateKey" })).await;
        assert_eq!(error_kind(unknown), BridgeErrorKind::UnknownOperation);

        let invalid = host
            .dispatch_value(json!({ "operation": "deriveByPath", "params": { "key": 5 } }))
            .await;
        assert_eq!(error_kind(invalid), BridgeErrorKind::InvalidArgument);

        let missing = host.dispatch_value(json!({ "params": {} })).await;
        assert_eq!(error_kind(missing), BridgeErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_prompt_index_out_of_range() {
        let (host, _) = host(7);
        let reply = host
            .dispatch(BridgeCall::PromptChoice(PromptSpec::derivation_or_seed(
                "User Key Id",
                "m/0/1",
            )))
            .await;
        assert_eq!(error_kind(reply), BridgeErrorKind::Dialog);
    }

    #[tokio::test]
    async fn test_ed25519_seed_derivation_delegates_to_sdk() {
        let (host, sdk) = host(0);
        host.dispatch(set_env(None)).await;
        let reply = host
            .dispatch(BridgeCall::DeriveBySeed {
                coin: "tsol".to_string(),
                key: "k".into(),
                seed: "s".into(),
            })
            .await;
        let value = reply.into_result().unwrap();
        assert_eq!(value["derivationPath"], "m/999999/1/2");
        let calls = sdk.calls.lock().unwrap();
        assert_eq!(calls.last().unwrap().0, SdkMethod::DeriveKeyWithSeed);
    }

    #[tokio::test]
    async fn test_auth_lifecycle() {
        let (host, _) = host(0);
        let status = host.dispatch(BridgeCall::GetAuthStatus).await.into_result().unwrap();
        assert_eq!(status["authenticated"], false);

        host.dispatch(BridgeCall::Authenticate {
            username: "ops".to_string(),
            password: "pw".into(),
            otp: "000000".into(),
        })
        .await
        .into_result()
        .unwrap();
        let identity = host.dispatch(BridgeCall::GetIdentity).await.into_result().unwrap();
        assert_eq!(identity["username"], "ops");

        host.dispatch(BridgeCall::EndSession).await.into_result().unwrap();
        let status = host.dispatch(BridgeCall::GetAuthStatus).await.into_result().unwrap();
        assert_eq!(status["authenticated"], false);
    }

    #[tokio::test]
    async fn test_queries() {
        let (host, _) = host(0);
        let version = host.dispatch(BridgeCall::GetVersion).await.into_result().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
        let chain = host
            .dispatch(BridgeCall::GetChainId {
                coin: "polygon".to_string(),
            })
            .await
            .into_result()
            .unwrap();
        assert_eq!(chain, "137");
    }
}
