//! 小数金额与链上整数单位的转换
//!
//! 取整规则（所有链统一）：转账金额向下截断，手续费向正无穷取整，
//! 避免多付转账金额或少付手续费。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::WalletError;

/// 转账金额转链上单位：截断（绝不多付）
pub fn amount_to_units(value: Decimal, decimals: u32) -> Result<u64, WalletError> {
    // 放大可能超出Decimal表示范围，必须走checked路径
    value
        .checked_mul(Decimal::from(10u64.pow(decimals)))
        .and_then(|scaled| {
            scaled
                .round_dp_with_strategy(0, RoundingStrategy::ToZero)
                .to_u64()
        })
        .ok_or_else(|| {
            WalletError::FailedToBuildTransaction(format!("amount {value} is not representable"))
        })
}

/// 手续费转链上单位：向正无穷取整（绝不少付）
pub fn fee_to_units(value: Decimal, decimals: u32) -> Result<u64, WalletError> {
    value
        .checked_mul(Decimal::from(10u64.pow(decimals)))
        .and_then(|scaled| {
            scaled
                .round_dp_with_strategy(0, RoundingStrategy::ToPositiveInfinity)
                .to_u64()
        })
        .ok_or_else(|| {
            WalletError::FailedToBuildTransaction(format!("fee {value} is not representable"))
        })
}

/// 链上整数单位转小数金额（用于余额显示）
pub fn units_to_amount(units: u64, decimals: u32) -> Decimal {
    Decimal::from(units) / Decimal::from(10u64.pow(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_amount_truncates() {
        // 0.00000001234 XLM (7位小数) -> 0.1234 stroops -> 截断为0
        let v = Decimal::from_str("0.00000001234").unwrap();
        assert_eq!(amount_to_units(v, 7).unwrap(), 0);

        let v = Decimal::from_str("10.5").unwrap();
        assert_eq!(amount_to_units(v, 7).unwrap(), 105_000_000);
    }

    #[test]
    fn test_fee_rounds_up() {
        let v = Decimal::from_str("0.00000001234").unwrap();
        assert_eq!(fee_to_units(v, 7).unwrap(), 1);

        // 整数值不受取整影响
        let v = Decimal::from_str("0.0000002").unwrap();
        assert_eq!(fee_to_units(v, 7).unwrap(), 2);
    }

    #[test]
    fn test_units_round_trip() {
        let d = units_to_amount(5_199_843_583, 12);
        assert_eq!(d, Decimal::from_str("0.005199843583").unwrap());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let v = Decimal::from_str("-1").unwrap();
        assert!(amount_to_units(v, 6).is_err());
    }

    /// 放大溢出返回类型化错误而不是panic
    #[test]
    fn test_overflow_returns_error() {
        assert!(matches!(
            amount_to_units(Decimal::MAX, 7),
            Err(WalletError::FailedToBuildTransaction(_))
        ));
        assert!(matches!(
            fee_to_units(Decimal::MAX, 7),
            Err(WalletError::FailedToBuildTransaction(_))
        ));
    }
}
