//! 用户提供的密钥材料
//!
//! 标识（identifier）是有歧义的：它可能是派生路径，也可能是种子。

use serde::{Deserialize, Serialize};

use crate::domain::secret::SecretString;

/// 派生路径前缀
pub const DERIVATION_PATH_MARKER: &str = "m/";

/// 密钥在请求中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    User,
    Backup,
}

impl KeyRole {
    /// 提示框里展示的描述
    pub fn description(&self) -> &'static str {
        match self {
            Self::User => "User Key Id",
            Self::Backup => "Backup Key Id",
        }
    }

    /// 对应的表单字段
    pub fn identifier_field(&self) -> &'static str {
        match self {
            Self::User => "userKeyId",
            Self::Backup => "backupKeyId",
        }
    }
}

/// (value, identifier?) 对
#[derive(Debug, Clone)]
pub struct KeyMaterialInput {
    pub role: KeyRole,
    pub value: SecretString,
    identifier: Option<String>,
}

impl KeyMaterialInput {
    /// 全空白标识视为不存在；其余标识原样保留
    pub fn new(role: KeyRole, value: impl Into<SecretString>, identifier: Option<String>) -> Self {
        let identifier = identifier.filter(|id| !id.trim().is_empty());
        Self {
            role,
            value: value.into(),
            identifier,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// 标识形如派生路径：长度 > 2 且以 `m/` 开头
    pub fn looks_like_path(&self) -> bool {
        self.identifier
            .as_deref()
            .map(is_path_shaped)
            .unwrap_or(false)
    }
}

pub fn is_path_shaped(identifier: &str) -> bool {
    identifier.len() > 2 && identifier.starts_with(DERIVATION_PATH_MARKER)
}

/// 派生策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivationChoice {
    DerivationPath,
    Seed,
}

impl DerivationChoice {
    /// 提示框按钮顺序
    pub const OPTIONS: [DerivationChoice; 2] = [Self::DerivationPath, Self::Seed];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DerivationPath => "Derivation Path",
            Self::Seed => "Seed",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::OPTIONS.get(index).copied()
    }
}

/// 阻塞式二选一提示框
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub title: String,
    pub message: String,
    pub options: Vec<String>,
}

impl PromptSpec {
    /// 派生路径 / 种子 消歧提示
    pub fn derivation_or_seed(description: &str, identifier: &str) -> Self {
        Self {
            title: "Derivation Path?".to_string(),
            message: format!(
                "Is the provided value a Derivation Path or a Seed?\n{}: {}\n",
                description, identifier
            ),
            options: DerivationChoice::OPTIONS
                .iter()
                .map(|choice| choice.label().to_string())
                .collect(),
        }
    }
}

/// 解析后的密钥
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: SecretString,
    /// 种子派生时 SDK 返回的实际路径
    pub derivation_path: Option<String>,
}

impl ResolvedKey {
    pub fn unchanged(key: SecretString) -> Self {
        Self {
            key,
            derivation_path: None,
        }
    }
}
