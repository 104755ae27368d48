//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{net::SocketAddr, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sdk: SdkConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// 特权进程监听配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 只允许回环地址
    pub bind_addr: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    #[serde(default)]
    pub ansi: bool,
}

/// coin SDK 子进程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub request_timeout_secs: u64,
}

/// 输出文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 默认保存目录，`~` 展开为 $HOME
    pub default_dir: String,
}

/// 不可信进程连接特权进程的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            ansi: std::env::var("LOG_ANSI")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            command: std::env::var("SDK_COMMAND").unwrap_or_else(|_| "node".into()),
            args: std::env::var("SDK_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|_| vec!["sdk-bridge.js".to_string()]),
            request_timeout_secs: std::env::var("SDK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "~".into()),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host_url: std::env::var("RECOVERY_HOST_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8787".into()),
            timeout_secs: std::env::var("RECOVERY_CLIENT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            sdk: SdkConfig::default(),
            output: OutputConfig::default(),
            client: ClientConfig::default(),
        })
    }

    /// 从配置文件加载配置（缺失的段使用环境变量/默认值）
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 监听地址（已校验为回环地址）
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr: SocketAddr = self
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {}", self.server.bind_addr))?;
        if !addr.ip().is_loopback() {
            anyhow::bail!("BIND_ADDR must be a loopback address, got {}", addr);
        }
        Ok(addr)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if self.sdk.command.trim().is_empty() {
            anyhow::bail!("SDK_COMMAND must not be empty");
        }
        if self.sdk.request_timeout_secs == 0 {
            anyhow::bail!("SDK_TIMEOUT_SECS must be positive");
        }

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
