//! coin SDK 封装层
//!
//! 交易构造与签名由外部 SDK 完成。特权进程把它作为子进程启动，
//! 通过 stdin/stdout 逐行交换 JSON：
//!
//! ```text
//! -> {"id":"<uuid>","method":"recover","params":{...}}
//! <- {"id":"<uuid>","result":{...}}
//! <- {"id":"<uuid>","error":{"message":"..."}}
//! ```

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
    sync::Mutex,
};
use uuid::Uuid;

use crate::config::SdkConfig;

/// SDK 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkMethod {
    Configure,
    Recover,
    WrongChainRecover,
    DeriveKeyWithSeed,
    Login,
    Logout,
    GetUser,
}

impl SdkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Recover => "recover",
            Self::WrongChainRecover => "wrongChainRecover",
            Self::DeriveKeyWithSeed => "deriveKeyWithSeed",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::GetUser => "getUser",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("failed to start coin SDK: {0}")]
    Spawn(String),
    #[error("coin SDK I/O error: {0}")]
    Io(String),
    #[error("coin SDK did not answer within {0}s")]
    Timeout(u64),
    #[error("coin SDK protocol error: {0}")]
    Protocol(String),
    /// SDK 明确返回的失败
    #[error("{0}")]
    Remote(String),
    #[error("coin SDK exited")]
    Closed,
}

/// coin SDK 统一接口
#[async_trait]
pub trait CoinSdk: Send + Sync {
    async fn call(&self, method: SdkMethod, params: Value) -> Result<Value, SdkError>;
}

#[derive(Serialize)]
struct SdkRequest<'a> {
    id: &'a str,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct SdkResponse {
    id: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<SdkRemoteError>,
}

#[derive(Deserialize)]
struct SdkRemoteError {
    message: String,
}

struct SdkProcess {
    // kill_on_drop：丢弃即终止子进程
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// 子进程实现
pub struct ProcessCoinSdk {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    process: Mutex<Option<SdkProcess>>,
}

impl ProcessCoinSdk {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            process: Mutex::new(None),
        }
    }

    fn spawn(&self) -> Result<SdkProcess, SdkError> {
        tracing::info!(command = %self.command, "coin_sdk_spawn");
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SdkError::Spawn(format!("{}: {}", self.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SdkError::Spawn("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SdkError::Spawn("stdout not captured".to_string()))?;

        Ok(SdkProcess {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    async fn exchange(process: &mut SdkProcess, id: &str, line: String) -> Result<Value, SdkError> {
        let io = |e: std::io::Error| SdkError::Io(e.to_string());
        process.stdin.write_all(line.as_bytes()).await.map_err(io)?;
        process.stdin.write_all(b"\n").await.map_err(io)?;
        process.stdin.flush().await.map_err(io)?;

        loop {
            let Some(line) = process.stdout.next_line().await.map_err(io)? else {
                return Err(SdkError::Closed);
            };
            if line.trim().is_empty() {
                continue;
            }
            let response: SdkResponse = match serde_json::from_str(&line) {
                Ok(response) => response,
                Err(_) => {
                    // SDK 自己打印的日志行
                    tracing::debug!(bytes = line.len(), "coin_sdk_non_protocol_line");
                    continue;
                }
            };
            if response.id != id {
                tracing::warn!(expected = %id, got = %response.id, "coin_sdk_stale_response");
                continue;
            }
            return match (response.result, response.error) {
                (_, Some(error)) => Err(SdkError::Remote(error.message)),
                (Some(result), None) => Ok(result),
                (None, None) => Ok(Value::Null),
            };
        }
    }
}

#[async_trait]
impl CoinSdk for ProcessCoinSdk {
    async fn call(&self, method: SdkMethod, params: Value) -> Result<Value, SdkError> {
        let mut guard = self.process.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn()?);
        }
        let process = guard.as_mut().ok_or(SdkError::Closed)?;

        let id = Uuid::new_v4().to_string();
        let line = serde_json::to_string(&SdkRequest {
            id: &id,
            method: method.as_str(),
            params: &params,
        })
        .map_err(|e| SdkError::Protocol(e.to_string()))?;

        tracing::debug!(method = method.as_str(), request_id = %id, "coin_sdk_call");
        let outcome = tokio::time::timeout(self.timeout, Self::exchange(process, &id, line)).await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(SdkError::Remote(message))) => Err(SdkError::Remote(message)),
            Ok(Err(e)) => {
                // 进程状态未知：下次调用重新启动
                tracing::error!(method = method.as_str(), error = %e, "coin_sdk_failed");
                *guard = None;
                Err(e)
            }
            Err(_) => {
                tracing::error!(method = method.as_str(), "coin_sdk_timeout");
                *guard = None;
                Err(SdkError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn sdk(script: &str, timeout_secs: u64) -> ProcessCoinSdk {
        ProcessCoinSdk::new(&SdkConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            request_timeout_secs: timeout_secs,
        })
    }

    const ECHO_ID: &str = r#"while read line; do
  id=$(printf '%s' "$line" | sed 's/^{"id":"\([^"]*\)".*/\1/')
  echo "sdk log line"
  printf '{"id":"%s","result":{"ok":true}}\n' "$id"
done"#;

    const FAIL_ID: &str = r#"while read line; do
  id=$(printf '%s' "$line" | sed 's/^{"id":"\([^"]*\)".*/\1/')
  printf '{"id":"%s","error":{"message":"insufficient funds"}}\n' "$id"
done"#;

    #[tokio::test]
    async fn test_round_trip_skips_log_lines() {
        let sdk = sdk(ECHO_ID, 5);
        let value = sdk.call(SdkMethod::GetUser, json!({})).await.unwrap();
        assert_eq!(value, json!({ "ok": true }));
        // 同一个子进程处理后续请求
        let value = sdk.call(SdkMethod::Logout, json!({})).await.unwrap();
        assert_eq!(value, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_remote_error_is_declared_failure() {
        let sdk = sdk(FAIL_ID, 5);
        let err = sdk.call(SdkMethod::Recover, json!({})).await.unwrap_err();
        assert_eq!(err, SdkError::Remote("insufficient funds".to_string()));
    }

    #[tokio::test]
    async fn test_silent_sdk_times_out() {
        let sdk = sdk("cat > /dev/null", 1);
        let err = sdk.call(SdkMethod::Configure, json!({})).await.unwrap_err();
        assert_eq!(err, SdkError::Timeout(1));
    }

    #[tokio::test]
    async fn test_exited_sdk_reports_closed() {
        let sdk = sdk("exit 0", 5);
        let err = sdk.call(SdkMethod::Configure, json!({})).await.unwrap_err();
        assert!(matches!(err, SdkError::Closed | SdkError::Io(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let sdk = ProcessCoinSdk::new(&SdkConfig {
            command: "/nonexistent/coin-sdk".to_string(),
            args: vec![],
            request_timeout_secs: 5,
        });
        let err = sdk.call(SdkMethod::Configure, json!({})).await.unwrap_err();
        assert!(matches!(err, SdkError::Spawn(_)));
    }
}
