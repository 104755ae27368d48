//! 恢复结果分类
//!
//! SDK 返回的原始 JSON 只有被识别为成功形态时才会被持久化。

use serde::Serialize;
use serde_json::Value;

use crate::domain::wallet_type::Signedness;

/// 交易序列化字段（SDK 不同币种使用不同字段名）
const SERIALIZED_TX_FIELDS: &[&str] = &["txHex", "tx", "serializedTx", "transactionHex"];

/// 恢复结果：封闭的三种形态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", content = "payload", rename_all = "camelCase")]
pub enum RecoveryResult {
    HalfSigned(Value),
    Unsigned(Value),
    /// SDK 声明的失败
    Error(String),
}

impl RecoveryResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error(_))
    }

    pub fn signedness(&self) -> Option<Signedness> {
        match self {
            Self::HalfSigned(_) => Some(Signedness::HalfSigned),
            Self::Unsigned(_) => Some(Signedness::Unsigned),
            Self::Error(_) => None,
        }
    }

    /// 成功形态的原始载荷
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::HalfSigned(value) | Self::Unsigned(value) => Some(value),
            Self::Error(_) => None,
        }
    }
}

/// 无法识别的结果形态
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unexpected recovery result shape: {0}")]
pub struct ShapeError(pub String);

/// 按规则分类 SDK 的原始返回值
pub fn classify(value: Value, expected: Signedness) -> Result<RecoveryResult, ShapeError> {
    let object = match value.as_object() {
        Some(object) => object,
        None => return Err(ShapeError(format!("expected an object, got {}", kind_of(&value)))),
    };

    if object.get("halfSigned").map(Value::is_object).unwrap_or(false) {
        return Ok(RecoveryResult::HalfSigned(value));
    }

    let has_tx_requests = object
        .get("txRequests")
        .and_then(Value::as_array)
        .map(|requests| !requests.is_empty())
        .unwrap_or(false);
    if has_tx_requests {
        return Ok(RecoveryResult::Unsigned(value));
    }

    let has_serialized_tx = SERIALIZED_TX_FIELDS.iter().any(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .map(|tx| !tx.is_empty())
            .unwrap_or(false)
    });
    if has_serialized_tx {
        return Ok(match expected {
            Signedness::HalfSigned => RecoveryResult::HalfSigned(value),
            Signedness::Unsigned => RecoveryResult::Unsigned(value),
        });
    }

    if let Some(error) = object.get("error").and_then(Value::as_str) {
        return Ok(RecoveryResult::Error(error.to_string()));
    }
    if object.len() == 1 {
        if let Some(message) = object.get("message").and_then(Value::as_str) {
            return Ok(RecoveryResult::Error(message.to_string()));
        }
    }

    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    Err(ShapeError(format!("object with fields [{}]", keys.join(", "))))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_half_signed_object() {
        let result = classify(
            json!({ "halfSigned": { "txHex": "0xdead" } }),
            Signedness::Unsigned,
        )
        .unwrap();
        assert_eq!(result.signedness(), Some(Signedness::HalfSigned));
    }

    #[test]
    fn test_tx_requests_are_unsigned() {
        let result = classify(
            json!({ "txRequests": [{ "transactions": [] }] }),
            Signedness::HalfSigned,
        )
        .unwrap();
        assert!(matches!(result, RecoveryResult::Unsigned(_)));

        assert!(classify(json!({ "txRequests": [] }), Signedness::Unsigned).is_err());
    }

    #[test]
    fn test_serialized_tx_follows_expected_signedness() {
        let hot = classify(json!({ "txHex": "0100" }), Signedness::HalfSigned).unwrap();
        let cold = classify(json!({ "serializedTx": "AQID" }), Signedness::Unsigned).unwrap();
        assert!(matches!(hot, RecoveryResult::HalfSigned(_)));
        assert!(matches!(cold, RecoveryResult::Unsigned(_)));
    }

    #[test]
    fn test_declared_error() {
        let result = classify(json!({ "error": "insufficient funds" }), Signedness::HalfSigned)
            .unwrap();
        assert_eq!(result, RecoveryResult::Error("insufficient funds".to_string()));
        assert!(!result.is_success());
    }

    #[test]
    fn test_unrecognised_shapes_fail() {
        assert!(classify(json!("done"), Signedness::HalfSigned).is_err());
        assert!(classify(json!(null), Signedness::HalfSigned).is_err());
        assert!(classify(json!({}), Signedness::HalfSigned).is_err());
        assert!(classify(json!({ "txHex": "" }), Signedness::HalfSigned).is_err());
        let err = classify(json!({ "foo": 1, "bar": 2 }), Signedness::Unsigned).unwrap_err();
        assert!(err.0.contains("bar, foo"));
    }
}
