//! 恢复请求
//!
//! `RecoveryRequest` 是领域类型：链扩展是一个枚举，结构上不可能混用。
//! `RecoverParams` 是桥接线上的形态：三个可选扩展字段，由特权进程重新校验。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{
    coin::{CoinFamily, CoinSpec, EvmFeeModel},
    secret::SecretString,
};

/// 备份密钥托管服务（KRS）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KrsProvider {
    #[serde(rename = "keyternal")]
    Keyternal,
    #[serde(rename = "bitgoKRSv2")]
    BitgoKrsV2,
    /// Coincover
    #[serde(rename = "dai")]
    Coincover,
}

impl FromStr for KrsProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "keyternal" => Ok(Self::Keyternal),
            "bitgoKRSv2" => Ok(Self::BitgoKrsV2),
            "dai" => Ok(Self::Coincover),
            other => Err(format!(
                "Key Recovery Service must be one of keyternal, bitgoKRSv2, dai (got {})",
                other
            )),
        }
    }
}

/// EIP-1559 费用（wei）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip1559Fees {
    pub max_fee_per_gas: u64,
    pub max_priority_fee_per_gas: u64,
}

/// 重放保护参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayProtectionOptions {
    pub chain: u64,
    pub hardfork: String,
}

/// Solana 持久 nonce 账户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableNonce {
    pub public_key: String,
    pub secret_key: SecretString,
}

/// 链扩展：每个请求恰好一种形态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainExtension {
    None,
    Eip1559(Eip1559Fees),
    ReplayProtection {
        options: ReplayProtectionOptions,
        /// 传统 gasPrice（wei）
        gas_price: u64,
    },
    DurableNonce(DurableNonce),
}

/// 扩展形态标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionShape {
    None,
    Eip1559,
    ReplayProtection,
    DurableNonce,
}

impl ExtensionShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Eip1559 => "eip1559",
            Self::ReplayProtection => "replayProtectionOptions",
            Self::DurableNonce => "durableNonce",
        }
    }
}

impl fmt::Display for ExtensionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChainExtension {
    pub fn shape(&self) -> ExtensionShape {
        match self {
            Self::None => ExtensionShape::None,
            Self::Eip1559(_) => ExtensionShape::Eip1559,
            Self::ReplayProtection { .. } => ExtensionShape::ReplayProtection,
            Self::DurableNonce(_) => ExtensionShape::DurableNonce,
        }
    }

    /// 币种允许的扩展形态
    pub fn allowed_shapes(spec: &CoinSpec) -> &'static [ExtensionShape] {
        match (spec.family, spec.fee_model) {
            (CoinFamily::Evm, Some(EvmFeeModel::LegacyReplayProtected { .. })) => {
                &[ExtensionShape::ReplayProtection]
            }
            (CoinFamily::Evm, _) => &[ExtensionShape::Eip1559],
            (CoinFamily::Solana, _) => &[ExtensionShape::None, ExtensionShape::DurableNonce],
            (CoinFamily::Utxo, _) => &[ExtensionShape::None],
        }
    }

    pub fn is_allowed_for(&self, spec: &CoinSpec) -> bool {
        Self::allowed_shapes(spec).contains(&self.shape())
    }
}

/// EVM 专有字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmRecoveryFields {
    pub gas_limit: u64,
    pub wallet_contract_address: String,
    pub bitgo_fee_address: String,
    pub token_contract_address: Option<String>,
}

/// 规范化的恢复请求（不含任何 key identifier 字段）
#[derive(Debug, Clone)]
pub struct RecoveryRequest {
    pub user_key: SecretString,
    pub backup_key: SecretString,
    pub bitgo_key: String,
    pub wallet_passphrase: SecretString,
    pub recovery_destination: String,
    pub scan: Option<u32>,
    pub krs_provider: Option<KrsProvider>,
    pub evm: Option<EvmRecoveryFields>,
    pub extension: ChainExtension,
}

impl RecoveryRequest {
    /// 转换为线上参数
    pub fn to_params(&self) -> RecoverParams {
        let mut params = RecoverParams {
            user_key: self.user_key.clone(),
            backup_key: self.backup_key.clone(),
            bitgo_key: self.bitgo_key.clone(),
            wallet_passphrase: self.wallet_passphrase.clone(),
            recovery_destination: self.recovery_destination.clone(),
            scan: self.scan,
            krs_provider: self.krs_provider,
            ..RecoverParams::default()
        };

        if let Some(evm) = &self.evm {
            params.gas_limit = Some(evm.gas_limit);
            params.wallet_contract_address = Some(evm.wallet_contract_address.clone());
            params.bitgo_fee_address = Some(evm.bitgo_fee_address.clone());
            params.token_contract_address = evm.token_contract_address.clone();
        }

        match &self.extension {
            ChainExtension::None => {}
            ChainExtension::Eip1559(fees) => params.eip1559 = Some(*fees),
            ChainExtension::ReplayProtection { options, gas_price } => {
                params.replay_protection_options = Some(options.clone());
                params.gas_price = Some(*gas_price);
            }
            ChainExtension::DurableNonce(nonce) => params.durable_nonce = Some(nonce.clone()),
        }

        params
    }
}

/// 线上恢复参数（camelCase，与 coin SDK 的 recover 参数一致）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoverParams {
    #[serde(default)]
    pub user_key: SecretString,
    #[serde(default)]
    pub backup_key: SecretString,
    #[serde(default)]
    pub bitgo_key: String,
    #[serde(default)]
    pub wallet_passphrase: SecretString,
    pub recovery_destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub krs_provider: Option<KrsProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip1559: Option<Eip1559Fees>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_protection_options: Option<ReplayProtectionOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitgo_fee_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durable_nonce: Option<DurableNonce>,
    #[serde(default)]
    pub ignore_address_types: Vec<String>,
}

/// 线上参数形态错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestShapeError {
    #[error("Mixed chain extensions in one request: {}", .0.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "))]
    MixedExtensions(Vec<ExtensionShape>),
    #[error("gasPrice is only valid together with replayProtectionOptions")]
    StrayGasPrice,
    #[error("replayProtectionOptions requires gasPrice")]
    MissingGasPrice,
    #[error("EVM recovery requires {0}")]
    MissingEvmField(&'static str),
    #[error("Extension {shape} is not valid for coin {coin}")]
    ExtensionNotAllowed {
        shape: ExtensionShape,
        coin: String,
    },
}

impl RecoverParams {
    /// 线上参数中出现的扩展形态
    pub fn extension_shapes(&self) -> Vec<ExtensionShape> {
        let mut shapes = Vec::new();
        if self.eip1559.is_some() {
            shapes.push(ExtensionShape::Eip1559);
        }
        if self.replay_protection_options.is_some() {
            shapes.push(ExtensionShape::ReplayProtection);
        }
        if self.durable_nonce.is_some() {
            shapes.push(ExtensionShape::DurableNonce);
        }
        shapes
    }
}

impl TryFrom<RecoverParams> for RecoveryRequest {
    type Error = RequestShapeError;

    fn try_from(params: RecoverParams) -> Result<Self, Self::Error> {
        let shapes = params.extension_shapes();
        if shapes.len() > 1 {
            return Err(RequestShapeError::MixedExtensions(shapes));
        }

        let extension = if let Some(fees) = params.eip1559 {
            if params.gas_price.is_some() {
                return Err(RequestShapeError::StrayGasPrice);
            }
            ChainExtension::Eip1559(fees)
        } else if let Some(options) = params.replay_protection_options.clone() {
            let gas_price = params.gas_price.ok_or(RequestShapeError::MissingGasPrice)?;
            ChainExtension::ReplayProtection { options, gas_price }
        } else if let Some(nonce) = params.durable_nonce.clone() {
            ChainExtension::DurableNonce(nonce)
        } else {
            if params.gas_price.is_some() {
                return Err(RequestShapeError::StrayGasPrice);
            }
            ChainExtension::None
        };

        let has_evm_fields = params.gas_limit.is_some()
            || params.wallet_contract_address.is_some()
            || params.bitgo_fee_address.is_some();
        let evm = if has_evm_fields {
            Some(EvmRecoveryFields {
                gas_limit: params
                    .gas_limit
                    .ok_or(RequestShapeError::MissingEvmField("gasLimit"))?,
                wallet_contract_address: params
                    .wallet_contract_address
                    .clone()
                    .ok_or(RequestShapeError::MissingEvmField("walletContractAddress"))?,
                bitgo_fee_address: params
                    .bitgo_fee_address
                    .clone()
                    .ok_or(RequestShapeError::MissingEvmField("bitgoFeeAddress"))?,
                token_contract_address: params.token_contract_address.clone(),
            })
        } else {
            None
        };

        Ok(RecoveryRequest {
            user_key: params.user_key.clone(),
            backup_key: params.backup_key.clone(),
            bitgo_key: params.bitgo_key.clone(),
            wallet_passphrase: params.wallet_passphrase.clone(),
            recovery_destination: params.recovery_destination.clone(),
            scan: params.scan,
            krs_provider: params.krs_provider,
            evm,
            extension,
        })
    }
}

impl RecoveryRequest {
    /// 校验扩展形态与币种匹配
    pub fn check_coin(&self, spec: &CoinSpec) -> Result<(), RequestShapeError> {
        if !self.extension.is_allowed_for(spec) {
            return Err(RequestShapeError::ExtensionNotAllowed {
                shape: self.extension.shape(),
                coin: spec.id.to_string(),
            });
        }
        if spec.is_evm() && self.evm.is_none() {
            return Err(RequestShapeError::MissingEvmField("gasLimit"));
        }
        Ok(())
    }
}

/// 错链恢复参数（资产被发送到了错误链上的同一地址）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CrossChainParams {
    pub txid: String,
    pub recovery_address: String,
    /// 源钱包 id
    pub wallet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_passphrase: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xprv: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    /// true: 生成半签名交易；false: 生成未签名交易
    #[serde(default)]
    pub signed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coin::CoinRegistry;

    fn evm_params() -> RecoverParams {
        RecoverParams {
            user_key: "U1".into(),
            recovery_destination: "0xdest".to_string(),
            gas_limit: Some(500_000),
            wallet_contract_address: Some("0xabc".to_string()),
            bitgo_fee_address: Some("0xfee".to_string()),
            eip1559: Some(Eip1559Fees {
                max_fee_per_gas: 500_000_000_000,
                max_priority_fee_per_gas: 50_000_000_000,
            }),
            ..RecoverParams::default()
        }
    }

    #[test]
    fn test_mixed_extensions_rejected() {
        let mut params = evm_params();
        params.durable_nonce = Some(DurableNonce {
            public_key: "pub".to_string(),
            secret_key: "sec".into(),
        });
        let err = RecoveryRequest::try_from(params).unwrap_err();
        assert_eq!(
            err,
            RequestShapeError::MixedExtensions(vec![
                ExtensionShape::Eip1559,
                ExtensionShape::DurableNonce
            ])
        );
    }

    #[test]
    fn test_key_identifier_fields_rejected_on_the_wire() {
        let json = serde_json::json!({
            "userKey": "U1",
            "userKeyId": "m/0/1/2",
            "recoveryDestination": "0xdest"
        });
        assert!(serde_json::from_value::<RecoverParams>(json).is_err());
    }

    #[test]
    fn test_wire_round_trip_keeps_single_extension() {
        let request = RecoveryRequest::try_from(evm_params()).unwrap();
        assert_eq!(request.extension.shape(), ExtensionShape::Eip1559);

        let json = serde_json::to_value(request.to_params()).unwrap();
        assert_eq!(json["eip1559"]["maxFeePerGas"], 500_000_000_000u64);
        assert!(json.get("durableNonce").is_none());
        assert!(json.get("replayProtectionOptions").is_none());
        assert!(json.get("userKeyId").is_none());
    }

    #[test]
    fn test_replay_protection_requires_gas_price() {
        let params = RecoverParams {
            recovery_destination: "0xdest".to_string(),
            replay_protection_options: Some(ReplayProtectionOptions {
                chain: 10001,
                hardfork: "london".to_string(),
            }),
            ..RecoverParams::default()
        };
        assert_eq!(
            RecoveryRequest::try_from(params).unwrap_err(),
            RequestShapeError::MissingGasPrice
        );
    }

    #[test]
    fn test_extension_must_match_coin() {
        let request = RecoveryRequest::try_from(evm_params()).unwrap();
        let polygon = CoinRegistry::lookup("polygon").unwrap();
        let sol = CoinRegistry::lookup("sol").unwrap();
        let ethw = CoinRegistry::lookup("ethw").unwrap();

        assert!(request.check_coin(polygon.spec()).is_ok());
        assert!(request.check_coin(sol.spec()).is_err());
        assert!(request.check_coin(ethw.spec()).is_err());
    }
}
