//! 币种注册表
//!
//! 所有跨越桥接边界的币种标识必须先经过这里的白名单校验。
//! 表格是静态的：新增/删除币种是一次编译期可见的改动。

use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::environment::Environment;

/// 币种家族，决定表单字段与链扩展形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinFamily {
    Evm,
    Solana,
    Utxo,
}

/// 加密曲线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    Secp256k1,
    Ed25519,
}

/// EVM 链的手续费模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmFeeModel {
    /// EIP-1559 fee market
    Eip1559,
    /// 传统 gasPrice，并需要显式 chain id + hardfork 重放保护
    LegacyReplayProtected {
        chain: u64,
        hardfork: &'static str,
    },
}

/// 单个币种的静态配置
#[derive(Debug, Clone)]
pub struct CoinSpec {
    /// 规范名称（小写）
    pub id: &'static str,
    pub full_name: &'static str,
    pub family: CoinFamily,
    pub curve: CurveType,
    /// 主网币种只在 prod 环境可用，测试网币种只在 test 环境可用
    pub environment: Environment,
    /// 链标识：EVM 为 chain id，其余为链名
    pub chain: &'static str,
    /// 仅 EVM 有意义
    pub fee_model: Option<EvmFeeModel>,
}

impl CoinSpec {
    pub fn is_evm(&self) -> bool {
        self.family == CoinFamily::Evm
    }
}

const fn evm(
    id: &'static str,
    full_name: &'static str,
    environment: Environment,
    chain: &'static str,
    fee_model: EvmFeeModel,
) -> CoinSpec {
    CoinSpec {
        id,
        full_name,
        family: CoinFamily::Evm,
        curve: CurveType::Secp256k1,
        environment,
        chain,
        fee_model: Some(fee_model),
    }
}

const fn non_evm(
    id: &'static str,
    full_name: &'static str,
    family: CoinFamily,
    curve: CurveType,
    environment: Environment,
) -> CoinSpec {
    CoinSpec {
        id,
        full_name,
        family,
        curve,
        environment,
        chain: id,
        fee_model: None,
    }
}

static COINS: &[CoinSpec] = &[
    evm("eth", "Ethereum", Environment::Prod, "1", EvmFeeModel::Eip1559),
    evm("hteth", "Holesky Testnet Ethereum", Environment::Test, "17000", EvmFeeModel::Eip1559),
    evm("polygon", "Polygon", Environment::Prod, "137", EvmFeeModel::Eip1559),
    evm("tpolygon", "Polygon Amoy Testnet", Environment::Test, "80002", EvmFeeModel::Eip1559),
    evm("bsc", "BNB Smart Chain", Environment::Prod, "56", EvmFeeModel::Eip1559),
    evm("tbsc", "BNB Smart Chain Testnet", Environment::Test, "97", EvmFeeModel::Eip1559),
    evm("arbeth", "Arbitrum One", Environment::Prod, "42161", EvmFeeModel::Eip1559),
    evm("tarbeth", "Arbitrum Sepolia", Environment::Test, "421614", EvmFeeModel::Eip1559),
    evm("opeth", "Optimism", Environment::Prod, "10", EvmFeeModel::Eip1559),
    evm("topeth", "Optimism Sepolia", Environment::Test, "11155420", EvmFeeModel::Eip1559),
    evm(
        "ethw",
        "Ethereum PoW",
        Environment::Prod,
        "10001",
        EvmFeeModel::LegacyReplayProtected {
            chain: 10001,
            hardfork: "london",
        },
    ),
    non_evm("sol", "Solana", CoinFamily::Solana, CurveType::Ed25519, Environment::Prod),
    non_evm("tsol", "Solana Testnet", CoinFamily::Solana, CurveType::Ed25519, Environment::Test),
    non_evm("btc", "Bitcoin", CoinFamily::Utxo, CurveType::Secp256k1, Environment::Prod),
    non_evm("tbtc", "Bitcoin Testnet", CoinFamily::Utxo, CurveType::Secp256k1, Environment::Test),
    non_evm("ltc", "Litecoin", CoinFamily::Utxo, CurveType::Secp256k1, Environment::Prod),
    non_evm("tltc", "Litecoin Testnet", CoinFamily::Utxo, CurveType::Secp256k1, Environment::Test),
];

static COIN_INDEX: Lazy<HashMap<&'static str, &'static CoinSpec>> =
    Lazy::new(|| COINS.iter().map(|spec| (spec.id, spec)).collect());

/// EVM 跨链恢复流程允许的币种（按环境）
const EVM_CROSS_CHAIN_PROD: &[&str] = &["polygon"];
const EVM_CROSS_CHAIN_TEST: &[&str] = &["tpolygon"];

/// 已通过白名单校验的币种标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CoinId {
    #[serde(skip)]
    spec: &'static CoinSpec,
    id: &'static str,
}

impl CoinId {
    pub fn as_str(&self) -> &'static str {
        self.id
    }

    pub fn spec(&self) -> &'static CoinSpec {
        self.spec
    }

    pub fn family(&self) -> CoinFamily {
        self.spec.family
    }
}

impl PartialEq for CoinSpec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CoinSpec {}

impl std::hash::Hash for CoinSpec {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

/// 币种查询失败原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoinError {
    #[error("Unsupported coin: {0}")]
    Unsupported(String),
    #[error("Coin {coin} is not available in the {environment} environment")]
    WrongEnvironment {
        coin: String,
        environment: Environment,
    },
}

/// 币种注册表（静态白名单）
pub struct CoinRegistry;

impl CoinRegistry {
    /// 按名称查找（不区分大小写，不校验环境）
    pub fn lookup(id: &str) -> Result<CoinId, CoinError> {
        let normalized = id.trim().to_lowercase();
        COIN_INDEX
            .get(normalized.as_str())
            .map(|spec| CoinId { spec, id: spec.id })
            .ok_or_else(|| CoinError::Unsupported(id.to_string()))
    }

    /// 查找并校验币种属于当前会话环境
    pub fn resolve(id: &str, environment: Environment) -> Result<CoinId, CoinError> {
        let coin = Self::lookup(id)?;
        if coin.spec.environment != environment {
            return Err(CoinError::WrongEnvironment {
                coin: coin.id.to_string(),
                environment,
            });
        }
        Ok(coin)
    }

    /// 某环境下可用的全部币种
    pub fn coins_for(environment: Environment) -> Vec<&'static str> {
        COINS
            .iter()
            .filter(|spec| spec.environment == environment)
            .map(|spec| spec.id)
            .collect()
    }

    /// EVM 跨链恢复流程的币种白名单
    pub fn evm_cross_chain_coins(environment: Environment) -> &'static [&'static str] {
        match environment {
            Environment::Prod => EVM_CROSS_CHAIN_PROD,
            Environment::Test => EVM_CROSS_CHAIN_TEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let coin = CoinRegistry::lookup("Polygon").unwrap();
        assert_eq!(coin.as_str(), "polygon");
        assert_eq!(coin.family(), CoinFamily::Evm);
        assert_eq!(coin.spec().chain, "137");
    }

    #[test]
    fn test_unknown_coin_rejected() {
        assert_eq!(
            CoinRegistry::lookup("doge"),
            Err(CoinError::Unsupported("doge".to_string()))
        );
    }

    #[test]
    fn test_environment_mismatch_rejected() {
        assert!(CoinRegistry::resolve("tpolygon", Environment::Test).is_ok());
        assert!(matches!(
            CoinRegistry::resolve("tpolygon", Environment::Prod),
            Err(CoinError::WrongEnvironment { .. })
        ));
    }

    #[test]
    fn test_replay_protected_chain() {
        let ethw = CoinRegistry::lookup("ethw").unwrap();
        assert_eq!(
            ethw.spec().fee_model,
            Some(EvmFeeModel::LegacyReplayProtected {
                chain: 10001,
                hardfork: "london"
            })
        );
    }

    #[test]
    fn test_every_environment_has_coins() {
        assert!(CoinRegistry::coins_for(Environment::Prod).contains(&"sol"));
        assert!(CoinRegistry::coins_for(Environment::Test).contains(&"tltc"));
        assert_eq!(CoinRegistry::evm_cross_chain_coins(Environment::Test), &["tpolygon"]);
    }
}
