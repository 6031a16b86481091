//! 交易意图、费用与待确认交易

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::amount::Amount;

/// 各链builder额外参数（跨链共用一个枚举，避免builder签名泛型化）
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionParams {
    /// Stellar备注
    StellarMemo(StellarMemo),
    /// Algorand note字段（最长1000字节）
    AlgorandNote(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StellarMemo {
    Text(String),
    Id(u64),
}

/// 费用参数：链相关的补充信息
#[derive(Debug, Clone, PartialEq)]
pub enum FeeParams {
    /// Sui gas价格与预算
    SuiGas { gas_price: u64, gas_budget: u64 },
    /// Chia每笔spend的cost估计
    ChiaCost { cost: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fee {
    pub amount: Amount,
    pub params: Option<FeeParams>,
}

impl Fee {
    pub fn new(amount: Amount) -> Self {
        Self {
            amount,
            params: None,
        }
    }

    pub fn with_params(amount: Amount, params: FeeParams) -> Self {
        Self {
            amount,
            params: Some(params),
        }
    }
}

/// 不可变的交易意图：builder的唯一输入
#[derive(Debug, Clone)]
pub struct Transaction {
    pub amount: Amount,
    pub fee: Fee,
    pub source_address: String,
    pub destination_address: String,
    pub contract_address: Option<String>,
    pub params: Option<TransactionParams>,
}

/// 交易在待确认列表中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    /// 已从内存池移除（过期或被拒）
    Removed,
}

/// 广播成功后合成的本地记录，由manager老化或轮询推进状态
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub hash: String,
    pub source: String,
    pub destination: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub date: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl PendingTransaction {
    /// 从已广播的交易意图合成记录
    pub fn from_transaction(hash: impl Into<String>, tx: &Transaction) -> Self {
        Self {
            hash: hash.into(),
            source: tx.source_address.clone(),
            destination: tx.destination_address.clone(),
            amount: tx.amount.value,
            fee: tx.fee.amount.value,
            date: Utc::now(),
            status: TransactionStatus::Pending,
        }
    }

    /// 自广播起的存活秒数
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.date).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amount::Amount;
    use chrono::Duration;
    use std::str::FromStr;

    fn sample_tx() -> Transaction {
        Transaction {
            amount: Amount::coin("XLM", Decimal::from_str("10.5").unwrap(), 7),
            fee: Fee::new(Amount::coin("XLM", Decimal::from_str("0.00001").unwrap(), 7)),
            source_address: "GAIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCF6M".into(),
            destination_address: "GARCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCFRVX".into(),
            contract_address: None,
            params: None,
        }
    }

    #[test]
    fn test_pending_synthesis() {
        let tx = sample_tx();
        let pending = PendingTransaction::from_transaction("abc123", &tx);
        assert_eq!(pending.hash, "abc123");
        assert_eq!(pending.amount, tx.amount.value);
        assert_eq!(pending.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_age_seconds() {
        let tx = sample_tx();
        let mut pending = PendingTransaction::from_transaction("abc123", &tx);
        pending.date = Utc::now() - Duration::seconds(42);
        assert!(pending.age_seconds(Utc::now()) >= 42);
    }
}
