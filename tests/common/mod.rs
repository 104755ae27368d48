//! 测试辅助模块
//! 假 SDK、脚本化对话框、记录调用的桥接传输

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ironrecover::{
    bridge::{BridgeCall, BridgeClient, BridgeReply, BridgeTransport, LocalBridgeTransport},
    domain::PromptSpec,
    service::{
        coin_sdk::{CoinSdk, SdkError, SdkMethod},
        dialogs::{DialogError, DialogProvider},
        privileged_host::PrivilegedHost,
        recovery_executor::RecoveryExecutor,
    },
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;

/// coins-bip32 文档中的主私钥
pub const MASTER_XPRV: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";

/// 假 SDK：记录所有调用，recover 返回预设结果
pub struct FakeSdk {
    recover: Mutex<Result<Value, String>>,
    calls: Mutex<Vec<(SdkMethod, Value)>>,
    gate: Option<Arc<Notify>>,
    timeout_on: Option<SdkMethod>,
}

impl FakeSdk {
    pub fn returning(result: Value) -> Self {
        Self {
            recover: Mutex::new(Ok(result)),
            calls: Mutex::new(Vec::new()),
            gate: None,
            timeout_on: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            recover: Mutex::new(Err(message.to_string())),
            calls: Mutex::new(Vec::new()),
            gate: None,
            timeout_on: None,
        }
    }

    /// recover 在 gate 被通知前一直挂起
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// 该方法的调用按超时失败
    pub fn timing_out_on(mut self, method: SdkMethod) -> Self {
        self.timeout_on = Some(method);
        self
    }

    pub fn half_signed() -> Self {
        Self::returning(json!({ "halfSigned": { "txHex": "0xdeadbeef" } }))
    }

    pub fn methods(&self) -> Vec<SdkMethod> {
        self.calls.lock().unwrap().iter().map(|(m, _)| *m).collect()
    }

    pub fn count(&self, method: SdkMethod) -> usize {
        self.methods().into_iter().filter(|m| *m == method).count()
    }

    /// 最近一次 recover 的参数
    pub fn recover_params(&self) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| *m == SdkMethod::Recover)
            .map(|(_, params)| params["params"].clone())
    }
}

#[async_trait]
impl CoinSdk for FakeSdk {
    async fn call(&self, method: SdkMethod, params: Value) -> Result<Value, SdkError> {
        self.calls.lock().unwrap().push((method, params));
        if self.timeout_on == Some(method) {
            return Err(SdkError::Timeout(30));
        }
        match method {
            SdkMethod::Recover | SdkMethod::WrongChainRecover => {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                self.recover.lock().unwrap().clone().map_err(SdkError::Remote)
            }
            SdkMethod::DeriveKeyWithSeed => Ok(json!({
                "key": "ed25519-derived",
                "derivationPath": "m/999999/1/2",
            })),
            SdkMethod::Login => Ok(json!({ "id": "u1", "username": "ops" })),
            SdkMethod::GetUser => Ok(json!({ "username": "ops" })),
            SdkMethod::Configure | SdkMethod::Logout => Ok(Value::Null),
        }
    }
}

/// 保存对话框的预设回答
#[derive(Debug, Clone)]
pub enum SaveAnswer {
    Default,
    Path(String),
    Cancel,
}

pub struct ScriptedDialogs {
    choice: usize,
    save: SaveAnswer,
    pub prompts: Mutex<Vec<PromptSpec>>,
    pub offered_paths: Mutex<Vec<String>>,
}

impl ScriptedDialogs {
    pub fn new(choice: usize, save: SaveAnswer) -> Self {
        Self {
            choice,
            save,
            prompts: Mutex::new(Vec::new()),
            offered_paths: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DialogProvider for ScriptedDialogs {
    async fn choose(&self, prompt: &PromptSpec) -> Result<usize, DialogError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.choice)
    }

    async fn save_destination(
        &self,
        default_path: &str,
        _extensions: &[String],
    ) -> Result<Option<String>, DialogError> {
        self.offered_paths.lock().unwrap().push(default_path.to_string());
        Ok(match &self.save {
            SaveAnswer::Default => Some(default_path.to_string()),
            SaveAnswer::Path(path) => Some(path.clone()),
            SaveAnswer::Cancel => None,
        })
    }
}

type CallHook = Box<dyn Fn(&BridgeCall) + Send + Sync>;

/// 转发到进程内 host，并记录每次调用
pub struct RecordingTransport {
    inner: LocalBridgeTransport,
    pub calls: Mutex<Vec<BridgeCall>>,
    hook: Mutex<Option<CallHook>>,
}

impl RecordingTransport {
    pub fn new(host: Arc<PrivilegedHost>) -> Self {
        Self {
            inner: LocalBridgeTransport::new(host),
            calls: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        }
    }

    /// 在调用转发之后执行
    pub fn set_hook(&self, hook: impl Fn(&BridgeCall) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(BridgeCall::name).collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.operations().into_iter().filter(|op| *op == operation).count()
    }
}

#[async_trait]
impl BridgeTransport for RecordingTransport {
    async fn invoke(&self, call: BridgeCall) -> BridgeReply {
        self.calls.lock().unwrap().push(call.clone());
        let reply = self.inner.invoke(call.clone()).await;
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(&call);
        }
        reply
    }
}

/// 完整的进程内测试环境
pub struct Harness {
    pub sdk: Arc<FakeSdk>,
    pub dialogs: Arc<ScriptedDialogs>,
    pub host: Arc<PrivilegedHost>,
    pub transport: Arc<RecordingTransport>,
    pub output: TempDir,
}

impl Harness {
    pub fn new(sdk: FakeSdk, dialogs: ScriptedDialogs) -> Self {
        let sdk = Arc::new(sdk);
        let dialogs = Arc::new(dialogs);
        let host = Arc::new(PrivilegedHost::new(sdk.clone(), dialogs.clone()));
        let transport = Arc::new(RecordingTransport::new(host.clone()));
        Self {
            sdk,
            dialogs,
            host,
            transport,
            output: tempfile::tempdir().expect("create temp output dir"),
        }
    }

    pub fn client(&self) -> BridgeClient {
        BridgeClient::new(self.transport.clone())
    }

    /// 默认输出目录指向临时目录
    pub fn executor(&self) -> RecoveryExecutor {
        RecoveryExecutor::new(self.client(), self.output_dir())
    }

    pub fn output_dir(&self) -> String {
        self.output.path().display().to_string()
    }

    pub fn written_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.output.path())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}
