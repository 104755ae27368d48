//! 钱包类型路由
//!
//! (钱包类型, 币种家族) → 参数构造器。新增组合必须在这里显式列出。

use crate::{
    domain::{CoinFamily, CoinId, CoinRegistry, Environment, WalletType},
    error::AppError,
    service::parameter_builder::RecoveryBuilder,
};

pub fn route(wallet_type: WalletType, coin: &CoinId) -> Result<RecoveryBuilder, AppError> {
    let builder = match (wallet_type, coin.family()) {
        (WalletType::Hot, CoinFamily::Evm) => Some(RecoveryBuilder::EvmHot),
        (WalletType::Cold, CoinFamily::Evm) => Some(RecoveryBuilder::EvmCold),
        (WalletType::Custody, CoinFamily::Evm) => Some(RecoveryBuilder::EvmCustody),
        (WalletType::Hot, CoinFamily::Solana) => Some(RecoveryBuilder::SolanaHot),
        (WalletType::Hot, CoinFamily::Utxo) => Some(RecoveryBuilder::UtxoHot),
        (WalletType::Cold, CoinFamily::Solana)
        | (WalletType::Cold, CoinFamily::Utxo)
        | (WalletType::Custody, CoinFamily::Solana)
        | (WalletType::Custody, CoinFamily::Utxo) => None,
    };

    builder.ok_or_else(|| {
        tracing::warn!(wallet_type = %wallet_type, coin = %coin, "recovery_route_missing");
        AppError::configuration(format!(
            "No recovery flow for {} wallets on {}",
            wallet_type, coin
        ))
    })
}

/// EVM 跨链恢复入口：币种必须属于当前环境的白名单
pub fn route_evm_cross_chain(
    environment: Environment,
    wallet_type: WalletType,
    coin: &str,
) -> Result<(CoinId, RecoveryBuilder), AppError> {
    let coin = CoinRegistry::resolve(coin, environment)?;
    if !CoinRegistry::evm_cross_chain_coins(environment).contains(&coin.as_str()) {
        return Err(AppError::configuration(format!(
            "{} is not available for EVM recovery in the {} environment",
            coin, environment
        )));
    }
    let builder = route(wallet_type, &coin)?;
    Ok((coin, builder))
}
