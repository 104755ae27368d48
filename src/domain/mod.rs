//! Domain 模块
//!
//! 恢复流程的领域模型：币种、环境、密钥材料、请求与结果

pub mod coin;
pub mod environment;
pub mod key_material;
pub mod recovery_request;
pub mod recovery_result;
pub mod secret;
pub mod wallet_type;

// 重新导出常用类型
pub use coin::{CoinFamily, CoinId, CoinRegistry, CoinSpec, CurveType, EvmFeeModel};
pub use environment::Environment;
pub use key_material::{DerivationChoice, KeyMaterialInput, KeyRole, PromptSpec, ResolvedKey};
pub use recovery_request::{
    ChainExtension, CrossChainParams, DurableNonce, Eip1559Fees, EvmRecoveryFields, KrsProvider,
    RecoverParams, RecoveryRequest, ReplayProtectionOptions,
};
pub use recovery_result::{classify, RecoveryResult};
pub use secret::SecretString;
pub use wallet_type::{Signedness, WalletType};
