//! 桥接操作集合
//!
//! 不可信进程能向特权进程发出的全部请求。集合是封闭的：
//! 新增操作必须在这里加一个变体，特权进程的 dispatch 才会编译通过。

use serde::{Deserialize, Serialize};

use crate::domain::{
    CrossChainParams, Environment, PromptSpec, RecoverParams, SecretString,
};

/// 操作种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// 有副作用
    Command,
    /// 只读
    Query,
}

/// 持久化文本编码（目前只有 UTF-8）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
}

/// 桥接调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "params", rename_all = "camelCase")]
pub enum BridgeCall {
    #[serde(rename_all = "camelCase")]
    SetEnvironment {
        environment: Environment,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coin: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<SecretString>,
    },
    DeriveByPath {
        key: SecretString,
        path: String,
    },
    DeriveBySeed {
        coin: String,
        key: SecretString,
        seed: SecretString,
    },
    Recover {
        coin: String,
        params: RecoverParams,
    },
    #[serde(rename_all = "camelCase")]
    CrossChainRecover {
        source_coin: String,
        destination_coin: String,
        params: CrossChainParams,
    },
    Persist {
        path: String,
        content: String,
        #[serde(default)]
        encoding: TextEncoding,
    },
    PromptChoice(PromptSpec),
    #[serde(rename_all = "camelCase")]
    ChooseSaveDestination {
        default_path: String,
        #[serde(default)]
        extensions: Vec<String>,
    },
    Authenticate {
        username: String,
        password: SecretString,
        otp: SecretString,
    },
    EndSession,
    GetVersion,
    GetChainId {
        coin: String,
    },
    GetIdentity,
    GetAuthStatus,
}

/// 线上操作名（与 `BridgeCall` 的 serde 标签一致）
pub const OPERATION_NAMES: &[&str] = &[
    "setEnvironment",
    "deriveByPath",
    "deriveBySeed",
    "recover",
    "crossChainRecover",
    "persist",
    "promptChoice",
    "chooseSaveDestination",
    "authenticate",
    "endSession",
    "getVersion",
    "getChainId",
    "getIdentity",
    "getAuthStatus",
];

impl BridgeCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetEnvironment { .. } => "setEnvironment",
            Self::DeriveByPath { .. } => "deriveByPath",
            Self::DeriveBySeed { .. } => "deriveBySeed",
            Self::Recover { .. } => "recover",
            Self::CrossChainRecover { .. } => "crossChainRecover",
            Self::Persist { .. } => "persist",
            Self::PromptChoice(_) => "promptChoice",
            Self::ChooseSaveDestination { .. } => "chooseSaveDestination",
            Self::Authenticate { .. } => "authenticate",
            Self::EndSession => "endSession",
            Self::GetVersion => "getVersion",
            Self::GetChainId { .. } => "getChainId",
            Self::GetIdentity => "getIdentity",
            Self::GetAuthStatus => "getAuthStatus",
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::GetVersion | Self::GetChainId { .. } | Self::GetIdentity | Self::GetAuthStatus => {
                OperationKind::Query
            }
            _ => OperationKind::Command,
        }
    }

    pub fn is_known_operation(name: &str) -> bool {
        OPERATION_NAMES.contains(&name)
    }
}

/// deriveBySeed 的返回值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDerivation {
    pub key: SecretString,
    pub derivation_path: String,
}

/// 已登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
}

/// getAuthStatus 的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_tag_matches_name() {
        let calls = vec![
            BridgeCall::SetEnvironment {
                environment: Environment::Test,
                coin: Some("tpolygon".to_string()),
                api_key: None,
            },
            BridgeCall::DeriveByPath {
                key: "xpub".into(),
                path: "m/0".to_string(),
            },
            BridgeCall::PromptChoice(PromptSpec::derivation_or_seed("User Key Id", "m/0/1")),
            BridgeCall::EndSession,
            BridgeCall::GetVersion,
            BridgeCall::GetChainId {
                coin: "polygon".to_string(),
            },
        ];
        for call in calls {
            let json = serde_json::to_value(&call).unwrap();
            assert_eq!(json["operation"], call.name());
            assert!(BridgeCall::is_known_operation(call.name()));
            let back: BridgeCall = serde_json::from_value(json).unwrap();
            assert_eq!(back, call);
        }
    }

    #[test]
    fn test_unit_operation_without_params() {
        let call: BridgeCall = serde_json::from_value(json!({ "operation": "getVersion" })).unwrap();
        assert_eq!(call, BridgeCall::GetVersion);
        assert_eq!(call.kind(), OperationKind::Query);
    }

    #[test]
    fn test_set_environment_wire_shape() {
        let call: BridgeCall = serde_json::from_value(json!({
            "operation": "setEnvironment",
            "params": { "environment": "prod", "coin": "polygon", "apiKey": "k" }
        }))
        .unwrap();
        assert_eq!(call.kind(), OperationKind::Command);
        match call {
            BridgeCall::SetEnvironment {
                environment,
                coin,
                api_key,
            } => {
                assert_eq!(environment, Environment::Prod);
                assert_eq!(coin.as_deref(), Some("polygon"));
                assert_eq!(api_key.unwrap().expose(), "k");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_persist_defaults_to_utf8() {
        let call: BridgeCall = serde_json::from_value(json!({
            "operation": "persist",
            "params": { "path": "/tmp/a.json", "content": "{}" }
        }))
        .unwrap();
        assert!(matches!(
            call,
            BridgeCall::Persist {
                encoding: TextEncoding::Utf8,
                ..
            }
        ));
    }
}
