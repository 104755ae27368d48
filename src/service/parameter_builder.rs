//! 恢复参数构造
//!
//! 把表单值变成经过校验的 `RecoveryDraft`。每种 (钱包类型, 币种家族)
//! 组合一个构造器；所有字段错误一次性收集后报告。

use std::{collections::BTreeMap, fmt};

use serde_json::Value;

use crate::{
    domain::{
        ChainExtension, CoinFamily, CoinId, DurableNonce, Eip1559Fees, EvmFeeModel,
        EvmRecoveryFields, KeyMaterialInput, KeyRole, KrsProvider, RecoveryRequest,
        ReplayProtectionOptions, ResolvedKey, SecretString, Signedness,
    },
    error::{AppError, FieldError},
    utils::units::gwei_to_wei,
};

/// Solana 默认扫描地址数
pub const DEFAULT_SOLANA_SCAN: u32 = 20;

pub mod fields {
    pub const USER_KEY: &str = "userKey";
    pub const USER_KEY_ID: &str = "userKeyId";
    pub const BACKUP_KEY: &str = "backupKey";
    pub const BACKUP_KEY_ID: &str = "backupKeyId";
    pub const BITGO_KEY: &str = "bitgoKey";
    pub const WALLET_PASSPHRASE: &str = "walletPassphrase";
    pub const RECOVERY_DESTINATION: &str = "recoveryDestination";
    pub const WALLET_CONTRACT_ADDRESS: &str = "walletContractAddress";
    pub const BITGO_FEE_ADDRESS: &str = "bitgoFeeAddress";
    pub const TOKEN_CONTRACT_ADDRESS: &str = "tokenContractAddress";
    pub const GAS_LIMIT: &str = "gasLimit";
    pub const MAX_FEE_PER_GAS: &str = "maxFeePerGas";
    pub const MAX_PRIORITY_FEE_PER_GAS: &str = "maxPriorityFeePerGas";
    pub const GAS_PRICE: &str = "gasPrice";
    pub const API_KEY: &str = "apiKey";
    pub const SCAN: &str = "scan";
    pub const KRS_PROVIDER: &str = "krsProvider";
    pub const PUBLIC_KEY: &str = "publicKey";
    pub const SECRET_KEY: &str = "secretKey";
}

use fields::*;

const EIP1559_FIELDS: &[&str] = &[MAX_FEE_PER_GAS, MAX_PRIORITY_FEE_PER_GAS];
const LEGACY_FEE_FIELDS: &[&str] = &[GAS_PRICE];
const DURABLE_NONCE_FIELDS: &[&str] = &[PUBLIC_KEY, SECRET_KEY];

/// 表单值（字段名 → 字符串）
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, String>);

impl fmt::Debug for FormValues {
    // 只打印字段名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<String>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// 去掉首尾空白后的非空值
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// 原样返回非空白值；密钥与口令不做修剪
    pub fn get_raw(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// 从 JSON 对象读取；数字与布尔值转成字符串，null 视为缺省
    pub fn from_json(value: &Value) -> Result<Self, AppError> {
        let object = value
            .as_object()
            .ok_or_else(|| AppError::bad_request("form must be a JSON object"))?;
        let mut form = Self::new();
        for (field, value) in object {
            match value {
                Value::Null => {}
                Value::String(s) => form.insert(field, s.clone()),
                Value::Number(n) => form.insert(field, n.to_string()),
                Value::Bool(b) => form.insert(field, b.to_string()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(AppError::bad_request(format!(
                        "form field '{}' must be a scalar",
                        field
                    )));
                }
            }
        }
        Ok(form)
    }
}

/// 收集字段错误
struct FieldCollector<'a> {
    form: &'a FormValues,
    errors: Vec<FieldError>,
}

impl<'a> FieldCollector<'a> {
    fn new(form: &'a FormValues) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn required(&mut self, field: &str) -> String {
        match self.form.get(field) {
            Some(value) => value.to_string(),
            None => {
                self.push(field, "is required");
                String::new()
            }
        }
    }

    fn required_raw(&mut self, field: &str) -> String {
        match self.form.get_raw(field) {
            Some(value) => value.to_string(),
            None => {
                self.push(field, "is required");
                String::new()
            }
        }
    }

    fn required_secret(&mut self, field: &str) -> SecretString {
        SecretString::new(self.required_raw(field))
    }

    fn optional(&self, field: &str) -> Option<String> {
        self.form.get(field).map(str::to_string)
    }

    fn key_input(&mut self, role: KeyRole, field: &str) -> KeyMaterialInput {
        let value = self.required_secret(field);
        let identifier = self.form.get_raw(role.identifier_field()).map(str::to_string);
        KeyMaterialInput::new(role, value, identifier)
    }

    fn gwei(&mut self, field: &str) -> u64 {
        let Some(value) = self.form.get(field) else {
            self.push(field, "is required");
            return 0;
        };
        match gwei_to_wei(value) {
            Ok(wei) => wei,
            Err(e) => {
                self.push(field, format!("must be an amount in gwei ({})", e));
                0
            }
        }
    }

    fn positive_int(&mut self, field: &str, default: Option<u64>) -> u64 {
        let Some(value) = self.form.get(field) else {
            return match default {
                Some(default) => default,
                None => {
                    self.push(field, "is required");
                    0
                }
            };
        };
        match value.parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                self.push(field, "must be a positive integer");
                0
            }
        }
    }

    fn scan(&mut self, default: Option<u32>) -> u32 {
        let value = self.positive_int(SCAN, default.map(u64::from));
        match u32::try_from(value) {
            Ok(scan) => scan,
            Err(_) => {
                self.push(SCAN, "is too large");
                0
            }
        }
    }

    fn krs_provider(&mut self) -> Option<KrsProvider> {
        let value = self.form.get(KRS_PROVIDER)?;
        match value.parse::<KrsProvider>() {
            Ok(provider) => Some(provider),
            Err(e) => {
                self.push(KRS_PROVIDER, e);
                None
            }
        }
    }

    /// 属于其他扩展形态的字段出现即报错
    fn reject_foreign(&mut self, foreign: &[&str], expected: &str) {
        for field in foreign {
            if self.form.has(field) {
                self.push(
                    field,
                    format!("mixed chain extension: this coin uses {}", expected),
                );
            }
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_failed(self.errors))
        }
    }
}

/// 构造器：每种 (钱包类型, 币种家族) 一个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryBuilder {
    EvmHot,
    EvmCold,
    EvmCustody,
    SolanaHot,
    UtxoHot,
}

impl RecoveryBuilder {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EvmHot => "evm_hot",
            Self::EvmCold => "evm_cold",
            Self::EvmCustody => "evm_custody",
            Self::SolanaHot => "solana_hot",
            Self::UtxoHot => "utxo_hot",
        }
    }

    pub fn family(&self) -> CoinFamily {
        match self {
            Self::EvmHot | Self::EvmCold | Self::EvmCustody => CoinFamily::Evm,
            Self::SolanaHot => CoinFamily::Solana,
            Self::UtxoHot => CoinFamily::Utxo,
        }
    }

    /// 热钱包产出半签名交易，冷钱包/托管钱包产出未签名交易
    pub fn signedness(&self) -> Signedness {
        match self {
            Self::EvmHot | Self::SolanaHot | Self::UtxoHot => Signedness::HalfSigned,
            Self::EvmCold | Self::EvmCustody => Signedness::Unsigned,
        }
    }

    pub fn build(&self, coin: &CoinId, form: &FormValues) -> Result<RecoveryDraft, AppError> {
        if coin.family() != self.family() {
            return Err(AppError::configuration(format!(
                "builder {} cannot build requests for coin {}",
                self.name(),
                coin
            )));
        }

        let mut collector = FieldCollector::new(form);
        let draft = match self {
            Self::EvmHot | Self::EvmCold | Self::EvmCustody => self.build_evm(coin, &mut collector),
            Self::SolanaHot => Self::build_solana(coin, &mut collector),
            Self::UtxoHot => Self::build_utxo(coin, &mut collector),
        };
        collector.finish()?;

        tracing::debug!(
            builder = self.name(),
            coin = %coin,
            extension = %draft.extension.shape(),
            "recovery_draft_built"
        );
        Ok(draft)
    }

    fn build_evm(&self, coin: &CoinId, c: &mut FieldCollector<'_>) -> RecoveryDraft {
        let user = match self {
            Self::EvmHot | Self::EvmCold => Some(c.key_input(KeyRole::User, USER_KEY)),
            _ => None,
        };
        let wallet_passphrase = match self {
            Self::EvmHot => c.required_secret(WALLET_PASSPHRASE),
            _ => SecretString::default(),
        };

        let evm = EvmRecoveryFields {
            gas_limit: c.positive_int(GAS_LIMIT, None),
            wallet_contract_address: c.required(WALLET_CONTRACT_ADDRESS),
            bitgo_fee_address: c.required(BITGO_FEE_ADDRESS),
            token_contract_address: c.optional(TOKEN_CONTRACT_ADDRESS),
        };

        let extension = match coin.spec().fee_model {
            Some(EvmFeeModel::LegacyReplayProtected { chain, hardfork }) => {
                c.reject_foreign(EIP1559_FIELDS, "gasPrice with replay protection");
                c.reject_foreign(DURABLE_NONCE_FIELDS, "gasPrice with replay protection");
                ChainExtension::ReplayProtection {
                    options: ReplayProtectionOptions {
                        chain,
                        hardfork: hardfork.to_string(),
                    },
                    gas_price: c.gwei(GAS_PRICE),
                }
            }
            Some(EvmFeeModel::Eip1559) | None => {
                c.reject_foreign(LEGACY_FEE_FIELDS, "EIP-1559 fees");
                c.reject_foreign(DURABLE_NONCE_FIELDS, "EIP-1559 fees");
                ChainExtension::Eip1559(Eip1559Fees {
                    max_fee_per_gas: c.gwei(MAX_FEE_PER_GAS),
                    max_priority_fee_per_gas: c.gwei(MAX_PRIORITY_FEE_PER_GAS),
                })
            }
        };

        let recovery_destination = c.required(RECOVERY_DESTINATION);
        let api_key = c.required_secret(API_KEY);

        RecoveryDraft {
            coin: coin.clone(),
            builder: *self,
            user,
            backup: None,
            bitgo_key: String::new(),
            wallet_passphrase,
            recovery_destination,
            scan: None,
            krs_provider: None,
            evm: Some(evm),
            extension,
            api_key: Some(api_key),
        }
    }

    fn build_solana(coin: &CoinId, c: &mut FieldCollector<'_>) -> RecoveryDraft {
        c.reject_foreign(EIP1559_FIELDS, "durable nonce");
        c.reject_foreign(LEGACY_FEE_FIELDS, "durable nonce");

        let user = c.key_input(KeyRole::User, USER_KEY);
        let backup = c.key_input(KeyRole::Backup, BACKUP_KEY);
        let bitgo_key = c.required_raw(BITGO_KEY);
        let wallet_passphrase = c.required_secret(WALLET_PASSPHRASE);
        let recovery_destination = c.required(RECOVERY_DESTINATION);
        let scan = c.scan(Some(DEFAULT_SOLANA_SCAN));
        let krs_provider = c.krs_provider();

        let secret_key = c.form.get_raw(SECRET_KEY).map(str::to_string);
        let extension = match (c.optional(PUBLIC_KEY), secret_key) {
            (Some(public_key), Some(secret_key)) => ChainExtension::DurableNonce(DurableNonce {
                public_key,
                secret_key: SecretString::new(secret_key),
            }),
            (None, None) => ChainExtension::None,
            (Some(_), None) => {
                c.push(SECRET_KEY, "is required when publicKey is provided");
                ChainExtension::None
            }
            (None, Some(_)) => {
                c.push(PUBLIC_KEY, "is required when secretKey is provided");
                ChainExtension::None
            }
        };

        RecoveryDraft {
            coin: coin.clone(),
            builder: Self::SolanaHot,
            user: Some(user),
            backup: Some(backup),
            bitgo_key,
            wallet_passphrase,
            recovery_destination,
            scan: Some(scan),
            krs_provider,
            evm: None,
            extension,
            api_key: None,
        }
    }

    fn build_utxo(coin: &CoinId, c: &mut FieldCollector<'_>) -> RecoveryDraft {
        c.reject_foreign(EIP1559_FIELDS, "no chain extension");
        c.reject_foreign(LEGACY_FEE_FIELDS, "no chain extension");
        c.reject_foreign(DURABLE_NONCE_FIELDS, "no chain extension");

        let api_key = c.required_secret(API_KEY);
        let user = c.key_input(KeyRole::User, USER_KEY);
        let backup = c.key_input(KeyRole::Backup, BACKUP_KEY);
        let bitgo_key = c.required_raw(BITGO_KEY);
        let wallet_passphrase = c.required_secret(WALLET_PASSPHRASE);
        let recovery_destination = c.required(RECOVERY_DESTINATION);
        let scan = c.scan(None);
        let krs_provider = c.krs_provider();

        RecoveryDraft {
            coin: coin.clone(),
            builder: Self::UtxoHot,
            user: Some(user),
            backup: Some(backup),
            bitgo_key,
            wallet_passphrase,
            recovery_destination,
            scan: Some(scan),
            krs_provider,
            evm: None,
            extension: ChainExtension::None,
            api_key: Some(api_key),
        }
    }
}

/// 已校验、但密钥尚未解析的恢复请求
#[derive(Debug, Clone)]
pub struct RecoveryDraft {
    pub coin: CoinId,
    pub builder: RecoveryBuilder,
    pub user: Option<KeyMaterialInput>,
    pub backup: Option<KeyMaterialInput>,
    bitgo_key: String,
    wallet_passphrase: SecretString,
    recovery_destination: String,
    scan: Option<u32>,
    krs_provider: Option<KrsProvider>,
    evm: Option<EvmRecoveryFields>,
    extension: ChainExtension,
    pub api_key: Option<SecretString>,
}

impl RecoveryDraft {
    pub fn signedness(&self) -> Signedness {
        self.builder.signedness()
    }

    pub fn extension(&self) -> &ChainExtension {
        &self.extension
    }

    pub fn recovery_destination(&self) -> &str {
        &self.recovery_destination
    }

    /// EVM 用钱包合约地址，其余用目标地址
    pub fn distinguisher(&self) -> &str {
        self.evm
            .as_ref()
            .map(|evm| evm.wallet_contract_address.as_str())
            .unwrap_or(&self.recovery_destination)
    }

    /// `recover-<coin>-<distinguisher>-prepared.<signedness>-<timestamp>.json`
    pub fn default_file_name(&self, timestamp_ms: i64) -> String {
        default_file_name(
            self.coin.as_str(),
            self.distinguisher(),
            self.signedness(),
            timestamp_ms,
        )
    }

    /// 用解析后的密钥生成请求；不带任何 key identifier
    pub fn into_request(
        self,
        user: Option<ResolvedKey>,
        backup: Option<ResolvedKey>,
    ) -> RecoveryRequest {
        let user_key = user
            .map(|resolved| resolved.key)
            .or_else(|| self.user.as_ref().map(|input| input.value.clone()))
            .unwrap_or_default();
        let backup_key = backup
            .map(|resolved| resolved.key)
            .or_else(|| self.backup.as_ref().map(|input| input.value.clone()))
            .unwrap_or_default();

        RecoveryRequest {
            user_key,
            backup_key,
            bitgo_key: self.bitgo_key,
            wallet_passphrase: self.wallet_passphrase,
            recovery_destination: self.recovery_destination,
            scan: self.scan,
            krs_provider: self.krs_provider,
            evm: self.evm,
            extension: self.extension,
        }
    }
}

/// 文件名中只保留安全字符
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn default_file_name(
    coin: &str,
    distinguisher: &str,
    signedness: Signedness,
    timestamp_ms: i64,
) -> String {
    format!(
        "recover-{}-{}-prepared.{}-{}.json",
        sanitize(coin),
        sanitize(distinguisher),
        signedness.marker(),
        timestamp_ms
    )
}
