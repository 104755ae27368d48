//! 钱包类型与签名程度

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// 钱包类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    /// 自管热钱包：用户私钥可用，产出半签名交易
    Hot,
    /// 自管冷钱包：只有公钥，产出未签名交易
    Cold,
    /// 托管钱包：产出未签名交易
    Custody,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Cold => "cold",
            Self::Custody => "custody",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "cold" => Ok(Self::Cold),
            "custody" => Ok(Self::Custody),
            other => Err(format!("Unsupported wallet type: {}", other)),
        }
    }
}

/// 恢复交易的签名程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signedness {
    HalfSigned,
    Unsigned,
}

impl Signedness {
    /// 文件名里使用的标记
    pub fn marker(&self) -> &'static str {
        match self {
            Self::HalfSigned => "half-signed",
            Self::Unsigned => "unsigned",
        }
    }
}
