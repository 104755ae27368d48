//! 日志脱敏
//!
//! 桥接调用与错误消息在进入日志或用户可见文本之前都要经过这里。

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::bridge::BridgeCall;

/// 可脱敏trait
pub trait SensitiveRedact {
    fn redact(&self) -> String;
}

/// 扩展密钥（xprv/xpub/tprv/tpub 以及 SLIP-132 变体）
static EXTENDED_KEY: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"\b([xtyzuvYZUV](?:prv|pub))[1-9A-HJ-NP-Za-km-z]{20,}").ok()
});

/// 32 字节十六进制（私钥形态）
static RAW_HEX_KEY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b(?:0x)?[0-9a-fA-F]{64}\b").ok());

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return "*".repeat(chars.len());
    }

    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// 密钥只保留类型前缀
pub fn redact_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    match key.get(..4) {
        Some(prefix) if prefix.ends_with("prv") || prefix.ends_with("pub") => {
            format!("{}***", prefix)
        }
        _ => "***".to_string(),
    }
}

/// 去掉自由文本里形似密钥的子串
pub fn scrub_key_material(text: &str) -> String {
    let mut scrubbed = text.to_string();
    if let Some(re) = EXTENDED_KEY.as_ref() {
        scrubbed = re.replace_all(&scrubbed, "${1}***").into_owned();
    }
    if let Some(re) = RAW_HEX_KEY.as_ref() {
        scrubbed = re.replace_all(&scrubbed, "[redacted-hex]").into_owned();
    }
    scrubbed
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 桥接调用脱敏
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl SensitiveRedact for BridgeCall {
    fn redact(&self) -> String {
        let summary = match self {
            BridgeCall::SetEnvironment {
                environment,
                coin,
                api_key,
            } => json!({
                "environment": environment,
                "coin": coin,
                "api_key": api_key.is_some(),
            }),
            BridgeCall::DeriveByPath { key, path } => json!({
                "key": redact_key(key.expose()),
                "path": path,
            }),
            BridgeCall::DeriveBySeed { coin, key, .. } => json!({
                "coin": coin,
                "key": redact_key(key.expose()),
            }),
            BridgeCall::Recover { coin, params } => json!({
                "coin": coin,
                "destination": redact_address(&params.recovery_destination),
                "extensions": params
                    .extension_shapes()
                    .iter()
                    .map(|shape| shape.as_str())
                    .collect::<Vec<_>>(),
            }),
            BridgeCall::CrossChainRecover {
                source_coin,
                destination_coin,
                params,
            } => json!({
                "source_coin": source_coin,
                "destination_coin": destination_coin,
                "txid": params.txid,
                "signed": params.signed,
            }),
            BridgeCall::Persist { path, content, .. } => json!({
                "path": path,
                "bytes": content.len(),
            }),
            BridgeCall::PromptChoice(prompt) => json!({
                "title": prompt.title,
                "options": prompt.options.len(),
            }),
            BridgeCall::ChooseSaveDestination { default_path, .. } => json!({
                "default_path": default_path,
            }),
            BridgeCall::Authenticate { username, .. } => json!({
                "username": username,
            }),
            BridgeCall::GetChainId { coin } => json!({ "coin": coin }),
            BridgeCall::EndSession
            | BridgeCall::GetVersion
            | BridgeCall::GetIdentity
            | BridgeCall::GetAuthStatus => json!({}),
        };
        format!("{} {}", self.name(), summary)
    }
}
