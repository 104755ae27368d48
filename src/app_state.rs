use std::sync::Arc;

use crate::{
    config::Config,
    service::{
        coin_sdk::{CoinSdk, ProcessCoinSdk},
        dialogs::{ConsoleDialogs, DialogProvider},
        privileged_host::PrivilegedHost,
    },
};

/// 特权进程的共享状态
#[derive(Clone)]
pub struct AppState {
    pub host: Arc<PrivilegedHost>,
    pub config: Arc<Config>,
}

impl AppState {
    /// 子进程 SDK + 控制台对话框
    pub fn new(config: Config) -> Self {
        let sdk: Arc<dyn CoinSdk> = Arc::new(ProcessCoinSdk::new(&config.sdk));
        let dialogs: Arc<dyn DialogProvider> = Arc::new(ConsoleDialogs);
        Self::with_host(Arc::new(PrivilegedHost::new(sdk, dialogs)), config)
    }

    pub fn with_host(host: Arc<PrivilegedHost>, config: Config) -> Self {
        Self {
            host,
            config: Arc::new(config),
        }
    }
}
