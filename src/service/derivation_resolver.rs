//! 密钥标识解析
//!
//! 标识可能是派生路径也可能是种子：形如 `m/...` 时必须先问用户，
//! 其余一律按种子处理。每次解析最多调用一次派生命令，不重试，
//! 失败时也不会退回另一种策略。

use crate::{
    bridge::BridgeClient,
    domain::{CoinId, DerivationChoice, KeyMaterialInput, PromptSpec, ResolvedKey},
    error::AppError,
};

/// 解析计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPlan {
    /// 没有标识，原样使用
    Unchanged,
    /// 直接按种子派生
    Seed { seed: String },
    /// 需要用户在路径/种子之间选择
    NeedsChoice { identifier: String, prompt: PromptSpec },
}

impl ResolutionPlan {
    /// 需要用户选择时要展示的提示
    pub fn prompt(&self) -> Option<&PromptSpec> {
        match self {
            Self::NeedsChoice { prompt, .. } => Some(prompt),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct DerivationResolver {
    client: BridgeClient,
}

impl DerivationResolver {
    pub fn new(client: BridgeClient) -> Self {
        Self { client }
    }

    pub fn plan(input: &KeyMaterialInput) -> ResolutionPlan {
        match input.identifier() {
            None => ResolutionPlan::Unchanged,
            Some(identifier) if input.looks_like_path() => ResolutionPlan::NeedsChoice {
                identifier: identifier.to_string(),
                prompt: PromptSpec::derivation_or_seed(input.role.description(), identifier),
            },
            Some(identifier) => ResolutionPlan::Seed {
                seed: identifier.to_string(),
            },
        }
    }

    /// 按计划执行；`choice` 只对 `NeedsChoice` 有意义
    pub async fn resolve_with_choice(
        &self,
        coin: &CoinId,
        input: &KeyMaterialInput,
        plan: ResolutionPlan,
        choice: Option<usize>,
    ) -> Result<ResolvedKey, AppError> {
        match plan {
            ResolutionPlan::Unchanged => Ok(ResolvedKey::unchanged(input.value.clone())),
            ResolutionPlan::Seed { seed } => self.derive_by_seed(coin, input, seed).await,
            ResolutionPlan::NeedsChoice { identifier, .. } => {
                match choice.and_then(DerivationChoice::from_index) {
                    Some(DerivationChoice::DerivationPath) => {
                        tracing::info!(role = ?input.role, "derive_by_path");
                        let key = self
                            .client
                            .derive_by_path(input.value.clone(), &identifier)
                            .await?;
                        Ok(ResolvedKey::unchanged(key))
                    }
                    Some(DerivationChoice::Seed) => {
                        self.derive_by_seed(coin, input, identifier).await
                    }
                    None => {
                        tracing::warn!(role = ?input.role, choice = ?choice, "derivation_choice_invalid");
                        Err(AppError::bridge(format!(
                            "derivation choice {:?} is not one of the offered options",
                            choice
                        )))
                    }
                }
            }
        }
    }

    /// 计划 + 提示 + 派生
    pub async fn resolve(
        &self,
        coin: &CoinId,
        input: &KeyMaterialInput,
    ) -> Result<ResolvedKey, AppError> {
        let plan = Self::plan(input);
        let choice = match plan.prompt() {
            Some(prompt) => Some(self.client.prompt_choice(prompt.clone()).await?),
            None => None,
        };
        self.resolve_with_choice(coin, input, plan, choice).await
    }

    async fn derive_by_seed(
        &self,
        coin: &CoinId,
        input: &KeyMaterialInput,
        seed: String,
    ) -> Result<ResolvedKey, AppError> {
        tracing::info!(role = ?input.role, coin = %coin, "derive_by_seed");
        let derived = self
            .client
            .derive_by_seed(coin.as_str(), input.value.clone(), seed.into())
            .await?;
        Ok(ResolvedKey {
            key: derived.key,
            derivation_path: Some(derived.derivation_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeCall, BridgeError, BridgeReply, BridgeTransport};
    use crate::domain::{CoinRegistry, KeyRole};
    use crate::error::AppErrorCode;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// 按操作名应答并记录调用
    struct ScriptedTransport {
        choice: usize,
        fail_derivation: bool,
        calls: Mutex<Vec<BridgeCall>>,
    }

    impl ScriptedTransport {
        fn new(choice: usize) -> Arc<Self> {
            Arc::new(Self {
                choice,
                fail_derivation: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn names(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().iter().map(BridgeCall::name).collect()
        }
    }

    #[async_trait]
    impl BridgeTransport for ScriptedTransport {
        async fn invoke(&self, call: BridgeCall) -> BridgeReply {
            let reply = match &call {
                BridgeCall::PromptChoice(_) => BridgeReply::ok(json!(self.choice)),
                _ if self.fail_derivation => BridgeReply::from(BridgeError::new(
                    crate::bridge::BridgeErrorKind::Derivation,
                    call.name(),
                    "invalid key",
                )),
                BridgeCall::DeriveByPath { key, path } => {
                    BridgeReply::ok(json!(format!("{}@{}", key.expose(), path)))
                }
                BridgeCall::DeriveBySeed { key, seed, .. } => BridgeReply::ok(json!({
                    "key": format!("{}#{}", key.expose(), seed.expose()),
                    "derivationPath": "m/999999/1/2",
                })),
                _ => BridgeReply::null(),
            };
            self.calls.lock().unwrap().push(call);
            reply
        }
    }

    fn resolver(transport: Arc<ScriptedTransport>) -> DerivationResolver {
        DerivationResolver::new(BridgeClient::new(transport))
    }

    fn input(identifier: Option<&str>) -> KeyMaterialInput {
        KeyMaterialInput::new(KeyRole::User, "U1", identifier.map(str::to_string))
    }

    #[test]
    fn test_plan() {
        assert_eq!(DerivationResolver::plan(&input(None)), ResolutionPlan::Unchanged);
        assert_eq!(
            DerivationResolver::plan(&input(Some("m/"))),
            ResolutionPlan::Seed {
                seed: "m/".to_string()
            }
        );
        assert_eq!(
            DerivationResolver::plan(&input(Some("seed words"))),
            ResolutionPlan::Seed {
                seed: "seed words".to_string()
            }
        );
        let plan = DerivationResolver::plan(&input(Some("m/0/1/2")));
        let prompt = plan.prompt().unwrap();
        assert_eq!(prompt.title, "Derivation Path?");
        assert_eq!(
            prompt.message,
            "Is the provided value a Derivation Path or a Seed?\nUser Key Id: m/0/1/2\n"
        );
        assert_eq!(prompt.options, vec!["Derivation Path", "Seed"]);
    }

    #[test]
    fn test_identifier_whitespace_is_significant() {
        // 路径标记必须位于开头
        assert_eq!(
            DerivationResolver::plan(&input(Some(" m/0/1"))),
            ResolutionPlan::Seed {
                seed: " m/0/1".to_string()
            }
        );
        assert_eq!(
            DerivationResolver::plan(&input(Some(" my seed "))),
            ResolutionPlan::Seed {
                seed: " my seed ".to_string()
            }
        );
        assert!(DerivationResolver::plan(&input(Some(" m/0/1"))).prompt().is_none());
    }

    #[tokio::test]
    async fn test_padded_seed_reaches_derivation_untouched() {
        let transport = ScriptedTransport::new(0);
        let coin = CoinRegistry::lookup("polygon").unwrap();
        let resolved = resolver(transport.clone())
            .resolve(&coin, &input(Some(" my seed ")))
            .await
            .unwrap();
        assert_eq!(resolved.key.expose(), "U1# my seed ");
        assert_eq!(transport.names(), vec!["deriveBySeed"]);
    }

    #[tokio::test]
    async fn test_absent_identifier_makes_no_call() {
        let transport = ScriptedTransport::new(0);
        let coin = CoinRegistry::lookup("polygon").unwrap();
        let resolved = resolver(transport.clone())
            .resolve(&coin, &input(None))
            .await
            .unwrap();
        assert_eq!(resolved.key.expose(), "U1");
        assert!(transport.names().is_empty());
    }

    #[tokio::test]
    async fn test_path_choice_derives_by_path_once() {
        let transport = ScriptedTransport::new(0);
        let coin = CoinRegistry::lookup("polygon").unwrap();
        let resolved = resolver(transport.clone())
            .resolve(&coin, &input(Some("m/0/1/2")))
            .await
            .unwrap();
        assert_eq!(resolved.key.expose(), "U1@m/0/1/2");
        assert_eq!(transport.names(), vec!["promptChoice", "deriveByPath"]);
    }

    #[tokio::test]
    async fn test_seed_choice_derives_by_seed() {
        let transport = ScriptedTransport::new(1);
        let coin = CoinRegistry::lookup("polygon").unwrap();
        let resolved = resolver(transport.clone())
            .resolve(&coin, &input(Some("m/0/1/2")))
            .await
            .unwrap();
        assert_eq!(resolved.key.expose(), "U1#m/0/1/2");
        assert_eq!(resolved.derivation_path.as_deref(), Some("m/999999/1/2"));
        assert_eq!(transport.names(), vec!["promptChoice", "deriveBySeed"]);
    }

    #[tokio::test]
    async fn test_non_path_identifier_skips_prompt() {
        let transport = ScriptedTransport::new(0);
        let coin = CoinRegistry::lookup("polygon").unwrap();
        resolver(transport.clone())
            .resolve(&coin, &input(Some("abc")))
            .await
            .unwrap();
        assert_eq!(transport.names(), vec!["deriveBySeed"]);
    }

    #[tokio::test]
    async fn test_out_of_range_choice_has_no_default() {
        let transport = ScriptedTransport::new(2);
        let coin = CoinRegistry::lookup("polygon").unwrap();
        let err = resolver(transport.clone())
            .resolve(&coin, &input(Some("m/0/1/2")))
            .await
            .unwrap_err();
        assert_eq!(err.code, AppErrorCode::Bridge);
        assert_eq!(transport.names(), vec!["promptChoice"]);
    }

    #[tokio::test]
    async fn test_derivation_failure_not_retried() {
        let transport = Arc::new(ScriptedTransport {
            choice: 0,
            fail_derivation: true,
            calls: Mutex::new(Vec::new()),
        });
        let coin = CoinRegistry::lookup("polygon").unwrap();
        let err = resolver(transport.clone())
            .resolve(&coin, &input(Some("m/0/1/2")))
            .await
            .unwrap_err();
        assert_eq!(err.code, AppErrorCode::Derivation);
        assert_eq!(transport.names(), vec!["promptChoice", "deriveByPath"]);
    }
}
