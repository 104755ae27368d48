//! 会话环境（生产 / 测试）

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// 会话环境，决定后端网络与 API 凭证
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "production")]
    Prod,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prod" | "production" => Ok(Self::Prod),
            "test" => Ok(Self::Test),
            other => Err(format!("Unsupported environment: {}", other)),
        }
    }
}
