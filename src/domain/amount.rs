//! 金额与资产类型
//!
//! 用户可见金额统一用Decimal表示，链上整数单位只在builder内部出现。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 链上代币（信任线资产/ASA/Coin type）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    /// 合约标识：Stellar为"CODE:ISSUER"，Algorand为资产ID，Sui为coin type
    pub contract_address: String,
    pub decimals: u32,
}

/// 金额归属的资产类别
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AmountType {
    /// 链原生币
    Coin,
    /// 代币
    Token(Token),
    /// 不可动用的储备（Stellar base reserve、Algorand min balance）
    Reserve,
    /// 手续费资源
    FeeResource,
}

/// 带类型与精度的金额
#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    pub amount_type: AmountType,
    pub currency_symbol: String,
    pub value: Decimal,
    pub decimals: u32,
}

impl Amount {
    pub fn coin(symbol: impl Into<String>, value: Decimal, decimals: u32) -> Self {
        Self {
            amount_type: AmountType::Coin,
            currency_symbol: symbol.into(),
            value,
            decimals,
        }
    }

    pub fn token(token: Token, value: Decimal) -> Self {
        Self {
            currency_symbol: token.symbol.clone(),
            decimals: token.decimals,
            amount_type: AmountType::Token(token),
            value,
        }
    }

    pub fn reserve(symbol: impl Into<String>, value: Decimal, decimals: u32) -> Self {
        Self {
            amount_type: AmountType::Reserve,
            currency_symbol: symbol.into(),
            value,
            decimals,
        }
    }

    pub fn is_coin(&self) -> bool {
        matches!(self.amount_type, AmountType::Coin)
    }

    pub fn is_token(&self) -> bool {
        matches!(self.amount_type, AmountType::Token(_))
    }
}
