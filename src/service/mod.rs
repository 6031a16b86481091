//! 链服务层：每条链一个transaction_builder / network_provider / wallet_manager
//!
//! WalletManager统一update/get_fee/send流程，状态机：
//! Idle → Updating → (Updated | Failed)。方法取&mut self，同一钱包的
//! 操作天然串行，跨任务共享时由调用方包tokio::sync::Mutex。

pub mod algorand;
pub mod chia;
pub mod stellar;
pub mod sui;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::SdkConfig;
use crate::domain::signer::TransactionSigner;
use crate::domain::transaction::{Fee, Transaction};
use crate::domain::wallet::Wallet;
use crate::error::WalletError;
use crate::infrastructure::failover::FailoverRouter;
use crate::infrastructure::http;

/// 管理器状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerState {
    #[default]
    Idle,
    Updating,
    Updated,
    Failed,
}

/// 广播成功的结果：链上交易哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSendResult {
    pub hash: String,
}

#[async_trait]
pub trait WalletManager: Send {
    fn wallet(&self) -> &Wallet;

    fn state(&self) -> ManagerState;

    /// 拉取账户状态，刷新builder参数，老化待确认列表；
    /// 任何拉取失败先清空展示金额再返回错误
    async fn update(&mut self) -> Result<(), WalletError>;

    /// 费用档位，低到高排列（单档链返回单元素）
    async fn get_fee(
        &mut self,
        amount: Decimal,
        destination: &str,
    ) -> Result<Vec<Fee>, WalletError>;

    /// 构建→签名→组装→广播→记入待确认列表
    async fn send(
        &mut self,
        transaction: &Transaction,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionSendResult, WalletError>;
}

/// 按配置组装Stellar管理器：共享HTTP客户端 + 多节点路由
pub fn build_stellar_manager(
    config: &SdkConfig,
    wallet: Wallet,
) -> Result<stellar::StellarWalletManager, WalletError> {
    let client = http::build_client(&config.network);
    let providers = config
        .stellar
        .urls
        .iter()
        .map(|url| stellar::StellarNetworkProvider::new(client.clone(), url.clone()))
        .collect();
    stellar::StellarWalletManager::new(wallet, FailoverRouter::new(providers)?)
}

/// 按配置组装Algorand管理器（节点携带各自的API令牌环）
pub fn build_algorand_manager(
    config: &SdkConfig,
    wallet: Wallet,
) -> Result<algorand::AlgorandWalletManager, WalletError> {
    let client = http::build_client(&config.network);
    let providers = config
        .algorand
        .nodes
        .iter()
        .map(|node| {
            algorand::AlgorandNetworkProvider::new(
                client.clone(),
                node.url.clone(),
                node.api_tokens.clone(),
            )
        })
        .collect();
    algorand::AlgorandWalletManager::new(wallet, FailoverRouter::new(providers)?)
}

/// 按配置组装Chia管理器
pub fn build_chia_manager(
    config: &SdkConfig,
    wallet: Wallet,
) -> Result<chia::ChiaWalletManager, WalletError> {
    let client = http::build_client(&config.network);
    let providers = config
        .chia
        .urls
        .iter()
        .map(|url| chia::ChiaNetworkProvider::new(client.clone(), url.clone()))
        .collect();
    chia::ChiaWalletManager::new(wallet, FailoverRouter::new(providers)?)
}

/// 按配置组装Sui管理器
pub fn build_sui_manager(
    config: &SdkConfig,
    wallet: Wallet,
) -> Result<sui::SuiWalletManager, WalletError> {
    let client = http::build_client(&config.network);
    let providers = config
        .sui
        .urls
        .iter()
        .map(|url| sui::SuiNetworkProvider::new(client.clone(), url.clone()))
        .collect();
    sui::SuiWalletManager::new(wallet, FailoverRouter::new(providers)?)
}

/// 原始费用估计展开为三档：×1.5 / ×2 / ×5，逐档向上取整
pub(crate) fn spread_fee_tiers(raw: Decimal, decimals: u32) -> Vec<Decimal> {
    [
        Decimal::new(15, 1), // 1.5
        Decimal::from(2),
        Decimal::from(5),
    ]
    .into_iter()
    .map(|multiplier| {
        (raw * multiplier).round_dp_with_strategy(decimals, RoundingStrategy::ToPositiveInfinity)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fee_tier_spread() {
        // 原始估计R → R×1.5, R×2, R×5，向上取整到链精度
        let raw = Decimal::from_str("0.000000000003").unwrap(); // 3 mojo (12位小数)
        let tiers = spread_fee_tiers(raw, 12);
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0], Decimal::from_str("0.000000000005").unwrap()); // 4.5 -> 5 mojo
        assert_eq!(tiers[1], Decimal::from_str("0.000000000006").unwrap());
        assert_eq!(tiers[2], Decimal::from_str("0.000000000015").unwrap());
    }

    #[test]
    fn test_manager_state_default_idle() {
        assert_eq!(ManagerState::default(), ManagerState::Idle);
    }
}
