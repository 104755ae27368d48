pub mod coin_sdk;
pub mod derivation_resolver;
pub mod dialogs;
pub mod key_derivation;
pub mod output_store;
pub mod parameter_builder; // 表单 → RecoveryDraft
pub mod privileged_host; // 桥接调用的执行端
pub mod recovery_executor;
pub mod wallet_router;
