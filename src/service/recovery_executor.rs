//! 恢复执行器
//!
//! 驱动一次恢复尝试走完整条链路：
//!
//! ```text
//! Idle -> ConfiguringEnvironment -> ResolvingKeys -> Invoking -> ValidatingResult
//!      -> Persisting -> Done
//! 任一阶段失败 -> Failed
//! ```
//!
//! 每个执行器同时只允许一次尝试；`abandon()` 之后正在进行的尝试在
//! 下一个挂起点停止，且不会写文件。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    bridge::BridgeClient,
    domain::{
        classify, CoinId, CoinRegistry, CrossChainParams, Environment, KeyMaterialInput,
        RecoveryResult, ResolvedKey, Signedness, WalletType,
    },
    error::AppError,
    service::{
        derivation_resolver::DerivationResolver,
        parameter_builder::{default_file_name, FormValues, RecoveryDraft},
        wallet_router,
    },
    utils::time_utils::unique_timestamp_millis,
};

/// 保存对话框的文件类型过滤
const SAVE_EXTENSIONS: &[&str] = &["json"];

/// 尝试状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    ConfiguringEnvironment,
    ResolvingKeys,
    Invoking,
    ValidatingResult,
    Persisting,
    Done,
    Failed,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ConfiguringEnvironment => "configuring_environment",
            Self::ResolvingKeys => "resolving_keys",
            Self::Invoking => "invoking",
            Self::ValidatingResult => "validating_result",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// 单向转换；终态不再变化
    pub fn can_transition(&self, to: AttemptState) -> bool {
        match self {
            Self::Idle => matches!(to, Self::ConfiguringEnvironment | Self::Failed),
            Self::ConfiguringEnvironment => {
                // 跨链恢复没有密钥解析阶段
                matches!(to, Self::ResolvingKeys | Self::Invoking | Self::Failed)
            }
            Self::ResolvingKeys => matches!(to, Self::Invoking | Self::Failed),
            Self::Invoking => matches!(to, Self::ValidatingResult | Self::Failed),
            Self::ValidatingResult => matches!(to, Self::Persisting | Self::Failed),
            Self::Persisting => matches!(to, Self::Done | Self::Failed),
            Self::Done | Self::Failed => false,
        }
    }
}

/// 进行中标志的 RAII 守卫
pub struct AttemptGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AttemptGuard<'a> {
    pub fn acquire(flag: &'a AtomicBool) -> Result<Self, AppError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::attempt_in_progress())?;
        Ok(Self { flag })
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 单次尝试的状态跟踪
struct AttemptTracker {
    id: Uuid,
    state: AttemptState,
}

impl AttemptTracker {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: AttemptState::Idle,
        }
    }

    fn advance(&mut self, to: AttemptState) -> Result<(), AppError> {
        if !self.state.can_transition(to) {
            return Err(AppError::internal(format!(
                "invalid attempt transition {} -> {}",
                self.state.as_str(),
                to.as_str()
            )));
        }
        tracing::debug!(
            attempt_id = %self.id,
            from = self.state.as_str(),
            to = to.as_str(),
            "recovery_attempt_transition"
        );
        self.state = to;
        Ok(())
    }

    fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = AttemptState::Failed;
        }
    }
}

/// 一次恢复尝试的输入
#[derive(Debug, Clone)]
pub struct RecoveryAttempt {
    pub environment: Environment,
    pub wallet_type: WalletType,
    pub coin: CoinId,
    pub draft: RecoveryDraft,
    /// 保存对话框的默认目录
    pub output_dir: Option<String>,
}

impl RecoveryAttempt {
    /// 校验币种 → 路由 → 构造
    pub fn prepare(
        environment: Environment,
        wallet_type: WalletType,
        coin: &str,
        form: &FormValues,
    ) -> Result<Self, AppError> {
        let coin = CoinRegistry::resolve(coin, environment)?;
        let builder = wallet_router::route(wallet_type, &coin)?;
        let draft = builder.build(&coin, form)?;
        Ok(Self {
            environment,
            wallet_type,
            coin,
            draft,
            output_dir: None,
        })
    }

    /// EVM 跨链流程入口（白名单币种）
    pub fn prepare_evm(
        environment: Environment,
        wallet_type: WalletType,
        coin: &str,
        form: &FormValues,
    ) -> Result<Self, AppError> {
        let (coin, builder) = wallet_router::route_evm_cross_chain(environment, wallet_type, coin)?;
        let draft = builder.build(&coin, form)?;
        Ok(Self {
            environment,
            wallet_type,
            coin,
            draft,
            output_dir: None,
        })
    }

    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// 跨链（打错链）恢复的输入
#[derive(Debug, Clone)]
pub struct CrossChainAttempt {
    pub environment: Environment,
    pub source_coin: CoinId,
    pub destination_coin: CoinId,
    pub params: CrossChainParams,
    pub output_dir: Option<String>,
}

impl CrossChainAttempt {
    pub fn prepare(
        environment: Environment,
        source_coin: &str,
        destination_coin: &str,
        params: CrossChainParams,
    ) -> Result<Self, AppError> {
        Ok(Self {
            environment,
            source_coin: CoinRegistry::resolve(source_coin, environment)?,
            destination_coin: CoinRegistry::resolve(destination_coin, environment)?,
            params,
            output_dir: None,
        })
    }

    pub fn signedness(&self) -> Signedness {
        if self.params.signed {
            Signedness::HalfSigned
        } else {
            Signedness::Unsigned
        }
    }
}

/// 成功写出的恢复文件
#[derive(Debug, Clone)]
pub struct PersistedRecovery {
    pub attempt_id: Uuid,
    pub path: String,
    pub result: RecoveryResult,
    /// 种子派生时实际使用的路径（user, backup）
    pub derivation_paths: Vec<String>,
}

pub struct RecoveryExecutor {
    client: BridgeClient,
    resolver: DerivationResolver,
    default_output_dir: String,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl RecoveryExecutor {
    pub fn new(client: BridgeClient, default_output_dir: impl Into<String>) -> Self {
        Self {
            resolver: DerivationResolver::new(client.clone()),
            client,
            default_output_dir: default_output_dir.into(),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 放弃进行中的尝试（例如用户离开了页面）
    pub fn abandon(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, "recovery_attempt_abandoned");
    }

    fn ensure_current(&self, generation: u64) -> Result<(), AppError> {
        if self.generation.load(Ordering::Acquire) != generation {
            return Err(AppError::abandoned());
        }
        Ok(())
    }

    fn default_path(&self, override_dir: Option<&str>, file_name: &str) -> String {
        let dir = override_dir.unwrap_or(&self.default_output_dir);
        format!("{}/{}", dir.trim_end_matches('/'), file_name)
    }

    pub async fn execute(&self, attempt: RecoveryAttempt) -> Result<PersistedRecovery, AppError> {
        let _guard = AttemptGuard::acquire(&self.in_flight)?;
        let generation = self.generation.load(Ordering::Acquire);
        let mut tracker = AttemptTracker::new();

        tracing::info!(
            attempt_id = %tracker.id,
            environment = %attempt.environment,
            wallet_type = %attempt.wallet_type,
            coin = %attempt.coin,
            builder = attempt.draft.builder.name(),
            "recovery_attempt_started"
        );

        let outcome = self.run(&mut tracker, generation, attempt).await;
        self.finish(&mut tracker, outcome)
    }

    pub async fn execute_cross_chain(
        &self,
        attempt: CrossChainAttempt,
    ) -> Result<PersistedRecovery, AppError> {
        let _guard = AttemptGuard::acquire(&self.in_flight)?;
        let generation = self.generation.load(Ordering::Acquire);
        let mut tracker = AttemptTracker::new();

        tracing::info!(
            attempt_id = %tracker.id,
            environment = %attempt.environment,
            source_coin = %attempt.source_coin,
            destination_coin = %attempt.destination_coin,
            "cross_chain_attempt_started"
        );

        let outcome = self.run_cross_chain(&mut tracker, generation, attempt).await;
        self.finish(&mut tracker, outcome)
    }

    fn finish(
        &self,
        tracker: &mut AttemptTracker,
        outcome: Result<PersistedRecovery, AppError>,
    ) -> Result<PersistedRecovery, AppError> {
        match &outcome {
            Ok(persisted) => {
                tracing::info!(attempt_id = %tracker.id, path = %persisted.path, "recovery_attempt_done");
            }
            Err(e) if e.is_user_declined() => {
                tracker.fail();
                tracing::info!(attempt_id = %tracker.id, "recovery_save_declined");
            }
            Err(e) => {
                let failed_in = tracker.state.as_str();
                tracker.fail();
                tracing::warn!(
                    attempt_id = %tracker.id,
                    state = failed_in,
                    code = e.code.as_str(),
                    error = %e,
                    "recovery_attempt_failed"
                );
            }
        }
        outcome
    }

    async fn run(
        &self,
        tracker: &mut AttemptTracker,
        generation: u64,
        attempt: RecoveryAttempt,
    ) -> Result<PersistedRecovery, AppError> {
        let RecoveryAttempt {
            environment,
            coin,
            draft,
            output_dir,
            ..
        } = attempt;

        tracker.advance(AttemptState::ConfiguringEnvironment)?;
        self.client
            .set_environment(environment, Some(coin.as_str()), draft.api_key.clone())
            .await?;
        self.ensure_current(generation)?;

        tracker.advance(AttemptState::ResolvingKeys)?;
        let user = self.resolve_key(&coin, draft.user.as_ref(), generation).await?;
        let backup = self.resolve_key(&coin, draft.backup.as_ref(), generation).await?;
        let derivation_paths: Vec<String> = [&user, &backup]
            .iter()
            .filter_map(|key| key.as_ref().and_then(|k| k.derivation_path.clone()))
            .collect();

        tracker.advance(AttemptState::Invoking)?;
        let signedness = draft.signedness();
        let file_name = draft.default_file_name(unique_timestamp_millis());
        let params = draft.into_request(user, backup).to_params();
        tracing::info!(attempt_id = %tracker.id, coin = %coin, "recovery_invoked");
        let raw = self.client.recover(coin.as_str(), params).await?;
        self.ensure_current(generation)?;

        tracker.advance(AttemptState::ValidatingResult)?;
        let result = Self::validate(tracker, raw, signedness)?;

        tracker.advance(AttemptState::Persisting)?;
        let path = self
            .persist(generation, output_dir.as_deref(), &file_name, &result)
            .await?;
        tracker.advance(AttemptState::Done)?;

        Ok(PersistedRecovery {
            attempt_id: tracker.id,
            path,
            result,
            derivation_paths,
        })
    }

    async fn run_cross_chain(
        &self,
        tracker: &mut AttemptTracker,
        generation: u64,
        attempt: CrossChainAttempt,
    ) -> Result<PersistedRecovery, AppError> {
        let signedness = attempt.signedness();
        let CrossChainAttempt {
            environment,
            source_coin,
            destination_coin,
            params,
            output_dir,
        } = attempt;

        tracker.advance(AttemptState::ConfiguringEnvironment)?;
        self.client
            .set_environment(environment, Some(source_coin.as_str()), params.api_key.clone())
            .await?;
        self.ensure_current(generation)?;

        tracker.advance(AttemptState::Invoking)?;
        let file_name = default_file_name(
            source_coin.as_str(),
            &params.txid,
            signedness,
            unique_timestamp_millis(),
        );
        let raw = self
            .client
            .cross_chain_recover(source_coin.as_str(), destination_coin.as_str(), params)
            .await?;
        self.ensure_current(generation)?;

        tracker.advance(AttemptState::ValidatingResult)?;
        let result = Self::validate(tracker, raw, signedness)?;

        tracker.advance(AttemptState::Persisting)?;
        let path = self
            .persist(generation, output_dir.as_deref(), &file_name, &result)
            .await?;
        tracker.advance(AttemptState::Done)?;

        Ok(PersistedRecovery {
            attempt_id: tracker.id,
            path,
            result,
            derivation_paths: Vec::new(),
        })
    }

    async fn resolve_key(
        &self,
        coin: &CoinId,
        input: Option<&KeyMaterialInput>,
        generation: u64,
    ) -> Result<Option<ResolvedKey>, AppError> {
        let Some(input) = input else {
            return Ok(None);
        };
        let resolved = self.resolver.resolve(coin, input).await?;
        self.ensure_current(generation)?;
        Ok(Some(resolved))
    }

    /// 只有成功变体才能进入持久化
    fn validate(
        tracker: &AttemptTracker,
        raw: serde_json::Value,
        signedness: Signedness,
    ) -> Result<RecoveryResult, AppError> {
        let result = classify(raw, signedness).map_err(|e| {
            tracing::error!(attempt_id = %tracker.id, error = %e, "recovery_result_unexpected_shape");
            AppError::unexpected_result_shape(e.to_string())
        })?;
        match result {
            RecoveryResult::Error(message) => Err(AppError::recovery(message)),
            success => Ok(success),
        }
    }

    async fn persist(
        &self,
        generation: u64,
        output_dir: Option<&str>,
        file_name: &str,
        result: &RecoveryResult,
    ) -> Result<String, AppError> {
        let payload = result
            .payload()
            .ok_or_else(|| AppError::internal("success result without payload"))?;
        let content = serde_json::to_string_pretty(payload)?;

        let default_path = self.default_path(output_dir, file_name);
        let chosen = self
            .client
            .choose_save_destination(&default_path, SAVE_EXTENSIONS)
            .await?;
        self.ensure_current(generation)?;

        let Some(path) = chosen else {
            return Err(AppError::user_declined("No file path selected"));
        };
        self.client.persist(&path, content).await?;
        Ok(path)
    }
}
