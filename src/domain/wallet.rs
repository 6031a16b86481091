//! 钱包聚合根：链标识、余额、待确认交易
//!
//! Wallet只由对应链的WalletManager修改，本身不做网络交互。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::amount::Token;
use super::transaction::{PendingTransaction, TransactionStatus};

/// 支持的区块链网络
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blockchain {
    Stellar { testnet: bool },
    Algorand { testnet: bool },
    Chia { testnet: bool },
    Sui { testnet: bool },
}

impl Blockchain {
    /// 原生币精度
    pub fn decimals(&self) -> u32 {
        match self {
            Self::Stellar { .. } => 7,
            Self::Algorand { .. } => 6,
            Self::Chia { .. } => 12,
            Self::Sui { .. } => 9,
        }
    }

    /// 原生币符号
    pub fn currency_symbol(&self) -> &'static str {
        match self {
            Self::Stellar { testnet: false } => "XLM",
            Self::Stellar { testnet: true } => "XLM", // testnet沿用主网符号
            Self::Algorand { .. } => "ALGO",
            Self::Chia { testnet: false } => "XCH",
            Self::Chia { testnet: true } => "TXCH",
            Self::Sui { .. } => "SUI",
        }
    }

    pub fn is_testnet(&self) -> bool {
        match self {
            Self::Stellar { testnet }
            | Self::Algorand { testnet }
            | Self::Chia { testnet }
            | Self::Sui { testnet } => *testnet,
        }
    }
}

/// 余额槽位：原生币/储备/代币分开记账
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Coin,
    Reserve,
    Token(String),
}

#[derive(Debug, Clone)]
pub struct Wallet {
    pub blockchain: Blockchain,
    pub public_key: Vec<u8>,
    pub addresses: Vec<String>,
    pub tokens: Vec<Token>,
    balances: HashMap<AssetKey, Decimal>,
    pending_transactions: Vec<PendingTransaction>,
}

impl Wallet {
    pub fn new(blockchain: Blockchain, public_key: Vec<u8>, address: String) -> Self {
        Self {
            blockchain,
            public_key,
            addresses: vec![address],
            tokens: Vec::new(),
            balances: HashMap::new(),
            pending_transactions: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        self.addresses.first().map(String::as_str).unwrap_or("")
    }

    pub fn set_balance(&mut self, key: AssetKey, value: Decimal) {
        self.balances.insert(key, value);
    }

    pub fn balance(&self, key: &AssetKey) -> Option<Decimal> {
        self.balances.get(key).copied()
    }

    pub fn coin_balance(&self) -> Decimal {
        self.balance(&AssetKey::Coin).unwrap_or_default()
    }

    /// 拉取失败时清空展示金额，避免显示过期余额
    pub fn clear_amounts(&mut self) {
        self.balances.clear();
    }

    pub fn add_pending_transaction(&mut self, pending: PendingTransaction) {
        self.pending_transactions.push(pending);
    }

    pub fn pending_transactions(&self) -> &[PendingTransaction] {
        &self.pending_transactions
    }

    /// 老化启发：超过max_age_seconds仍无明确状态的待确认交易视为已确认并移除
    pub fn remove_pending_older_than(&mut self, now: DateTime<Utc>, max_age_seconds: i64) {
        self.pending_transactions
            .retain(|p| p.age_seconds(now) <= max_age_seconds);
    }

    /// 按哈希推进待确认交易状态；Confirmed/Removed会从列表剔除
    pub fn resolve_pending(&mut self, hash: &str, status: TransactionStatus) {
        if status == TransactionStatus::Pending {
            return;
        }
        self.pending_transactions.retain(|p| p.hash != hash);
    }

    pub fn has_pending_transactions(&self) -> bool {
        !self.pending_transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amount::Amount;
    use crate::domain::transaction::{Fee, Transaction};
    use chrono::Duration;
    use std::str::FromStr;

    fn sample_wallet() -> Wallet {
        Wallet::new(
            Blockchain::Stellar { testnet: false },
            vec![0x11; 32],
            "GAIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCF6M".into(),
        )
    }

    fn pending_aged(seconds: i64) -> PendingTransaction {
        let tx = Transaction {
            amount: Amount::coin("XLM", Decimal::from_str("1").unwrap(), 7),
            fee: Fee::new(Amount::coin("XLM", Decimal::from_str("0.00001").unwrap(), 7)),
            source_address: "src".into(),
            destination_address: "dst".into(),
            contract_address: None,
            params: None,
        };
        let mut p = PendingTransaction::from_transaction(format!("tx-{seconds}"), &tx);
        p.date = Utc::now() - Duration::seconds(seconds);
        p
    }

    /// 老化：超过阈值的条目被移除，更新的保留
    #[test]
    fn test_pending_aging() {
        let mut wallet = sample_wallet();
        wallet.add_pending_transaction(pending_aged(30));
        wallet.add_pending_transaction(pending_aged(5));
        wallet.remove_pending_older_than(Utc::now(), 10);
        assert_eq!(wallet.pending_transactions().len(), 1);
        assert_eq!(wallet.pending_transactions()[0].hash, "tx-5");
    }

    #[test]
    fn test_resolve_pending() {
        let mut wallet = sample_wallet();
        wallet.add_pending_transaction(pending_aged(1));
        wallet.resolve_pending("tx-1", TransactionStatus::Pending);
        assert!(wallet.has_pending_transactions());
        wallet.resolve_pending("tx-1", TransactionStatus::Confirmed);
        assert!(!wallet.has_pending_transactions());
    }

    #[test]
    fn test_clear_amounts() {
        let mut wallet = sample_wallet();
        wallet.set_balance(AssetKey::Coin, Decimal::from_str("100").unwrap());
        wallet.set_balance(AssetKey::Reserve, Decimal::from_str("1").unwrap());
        wallet.clear_amounts();
        assert!(wallet.balance(&AssetKey::Coin).is_none());
        assert_eq!(wallet.coin_balance(), Decimal::ZERO);
    }
}
