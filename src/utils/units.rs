//! 单位换算
//!
//! 用户以 gwei 十进制字符串输入手续费，SDK 需要整数 wei。
//! 换算必须精确：不允许浮点舍入。

use std::str::FromStr;

use rust_decimal::{prelude::ToPrimitive, Decimal};

/// gwei → wei
pub const GWEI_DECIMALS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("value is required")]
    Empty,
    #[error("'{0}' is not a decimal number")]
    NotNumeric(String),
    #[error("'{0}' must not be negative")]
    Negative(String),
    #[error("'{value}' has more than {decimals} decimal places")]
    TooPrecise { value: String, decimals: u32 },
    #[error("'{0}' is too large")]
    Overflow(String),
}

/// 十进制字符串按 `decimals` 位精度换算为整数基础单位
pub fn to_base_units(value: &str, decimals: u32) -> Result<u64, UnitError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UnitError::Empty);
    }

    let amount = Decimal::from_str_exact(trimmed)
        .or_else(|_| Decimal::from_str(trimmed))
        .map_err(|_| UnitError::NotNumeric(trimmed.to_string()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitError::Negative(trimmed.to_string()));
    }

    // "1.50" 的有效精度是 1 位
    if amount.normalize().scale() > decimals {
        return Err(UnitError::TooPrecise {
            value: trimmed.to_string(),
            decimals,
        });
    }

    let factor = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| UnitError::Overflow(trimmed.to_string()))?;

    amount
        .checked_mul(factor)
        .and_then(|scaled| scaled.trunc().to_u64())
        .ok_or_else(|| UnitError::Overflow(trimmed.to_string()))
}

/// gwei 字符串 → wei
pub fn gwei_to_wei(value: &str) -> Result<u64, UnitError> {
    to_base_units(value, GWEI_DECIMALS)
}
