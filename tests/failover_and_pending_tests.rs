//! 故障转移与待确认列表集成测试
//!
//! 通过公开API验证：路由器的粘性切换与错误分类、钱包待确认
//! 交易的老化与状态推进。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use ironwallet::domain::amount::Amount;
use ironwallet::domain::transaction::{Fee, PendingTransaction, Transaction, TransactionStatus};
use ironwallet::domain::wallet::{Blockchain, Wallet};
use ironwallet::error::WalletError;
use ironwallet::infrastructure::failover::{FailoverRouter, HostProvider};

#[derive(Clone)]
struct FlakyProvider {
    host: String,
    /// 前N次调用返回网络错误
    failures_left: Arc<AtomicUsize>,
}

impl FlakyProvider {
    fn new(host: &str, failures: usize) -> Self {
        Self {
            host: host.into(),
            failures_left: Arc::new(AtomicUsize::new(failures)),
        }
    }

    async fn balance(&self) -> Result<u64, WalletError> {
        if self
            .failures_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(WalletError::NetworkUnavailable {
                host: self.host.clone(),
                reason: "timeout".into(),
            });
        }
        Ok(1000)
    }
}

impl HostProvider for FlakyProvider {
    fn host(&self) -> &str {
        &self.host
    }
}

/// 节点恢复后路由器停留在恢复的节点上，不再回到故障节点
#[tokio::test]
async fn test_router_sticks_after_recovery() {
    let router = FailoverRouter::new(vec![
        FlakyProvider::new("https://a", usize::MAX),
        FlakyProvider::new("https://b", 0),
        FlakyProvider::new("https://c", 0),
    ])
    .unwrap();

    for _ in 0..5 {
        let value = router.perform(|p| async move { p.balance().await }).await.unwrap();
        assert_eq!(value, 1000);
        assert_eq!(router.current_host(), "https://b");
    }
}

/// 临时故障在一次perform内被吸收，调用方只看到成功结果
#[tokio::test]
async fn test_transient_failure_absorbed() {
    let router = FailoverRouter::new(vec![
        FlakyProvider::new("https://a", 1),
        FlakyProvider::new("https://b", 0),
    ])
    .unwrap();

    let value = router.perform(|p| async move { p.balance().await }).await.unwrap();
    assert_eq!(value, 1000);
    assert_eq!(router.current_host(), "https://b");

    let value = router.perform(|p| async move { p.balance().await }).await.unwrap();
    assert_eq!(value, 1000);
}

fn sample_transaction() -> Transaction {
    Transaction {
        amount: Amount::coin("XCH", Decimal::from_str("0.001").unwrap(), 12),
        fee: Fee::new(Amount::coin("XCH", Decimal::from_str("0.000000001").unwrap(), 12)),
        source_address: "xch1source".into(),
        destination_address: "xch1dest".into(),
        contract_address: None,
        params: None,
    }
}

/// 老化边界：超过阈值的条目移除，刚好在阈值内的保留
#[test]
fn test_pending_aging_boundary() {
    let mut wallet = Wallet::new(
        Blockchain::Chia { testnet: false },
        vec![0u8; 48],
        "xch1wallet".into(),
    );
    let tx = sample_transaction();

    let mut old = PendingTransaction::from_transaction("old", &tx);
    old.date = Utc::now() - Duration::seconds(90);
    let mut fresh = PendingTransaction::from_transaction("fresh", &tx);
    fresh.date = Utc::now() - Duration::seconds(30);
    wallet.add_pending_transaction(old);
    wallet.add_pending_transaction(fresh);

    wallet.remove_pending_older_than(Utc::now(), 60);
    assert_eq!(wallet.pending_transactions().len(), 1);
    assert_eq!(wallet.pending_transactions()[0].hash, "fresh");
}

/// 状态推进：confirmed/removed从列表剔除，pending保留
#[test]
fn test_pending_resolution() {
    let mut wallet = Wallet::new(
        Blockchain::Algorand { testnet: false },
        vec![0u8; 32],
        "ALGOADDR".into(),
    );
    let tx = sample_transaction();
    wallet.add_pending_transaction(PendingTransaction::from_transaction("t1", &tx));
    wallet.add_pending_transaction(PendingTransaction::from_transaction("t2", &tx));

    wallet.resolve_pending("t1", TransactionStatus::Pending);
    assert_eq!(wallet.pending_transactions().len(), 2);

    wallet.resolve_pending("t1", TransactionStatus::Confirmed);
    wallet.resolve_pending("t2", TransactionStatus::Removed);
    assert!(!wallet.has_pending_transactions());
}
