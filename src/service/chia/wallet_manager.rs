//! Chia钱包管理器
//!
//! 余额 = 保留的未花费coin总额（最多15个，金额降序）。全节点没有
//! 逐交易的轻量状态接口，待确认交易按60秒老化视为已确认（近似处理）。
//! 费用档位：原始估算 ×1.5 / ×2 / ×5 逐档向上取整。

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::amount::Amount;
use crate::domain::signer::TransactionSigner;
use crate::domain::transaction::{Fee, FeeParams, PendingTransaction, Transaction};
use crate::domain::wallet::{AssetKey, Wallet};
use crate::error::WalletError;
use crate::infrastructure::failover::FailoverRouter;
use crate::service::{spread_fee_tiers, ManagerState, TransactionSendResult, WalletManager};
use crate::utils::amount_converter::units_to_amount;

use super::network_provider::ChiaNetworkProvider;
use super::transaction_builder::{ChiaTransactionBuilder, CHIA_DECIMALS};

/// 待确认交易老化阈值（秒）
const PENDING_MAX_AGE_SECONDS: i64 = 60;

pub struct ChiaWalletManager {
    wallet: Wallet,
    builder: ChiaTransactionBuilder,
    router: FailoverRouter<ChiaNetworkProvider>,
    state: ManagerState,
}

impl ChiaWalletManager {
    pub fn new(
        wallet: Wallet,
        router: FailoverRouter<ChiaNetworkProvider>,
    ) -> Result<Self, WalletError> {
        let builder =
            ChiaTransactionBuilder::new(&wallet.public_key, wallet.blockchain.is_testnet())?;
        Ok(Self {
            wallet,
            builder,
            router,
            state: ManagerState::Idle,
        })
    }
}

#[async_trait]
impl WalletManager for ChiaWalletManager {
    fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    fn state(&self) -> ManagerState {
        self.state
    }

    async fn update(&mut self) -> Result<(), WalletError> {
        self.state = ManagerState::Updating;
        let puzzle_hash = self.builder.puzzle_hash();
        let result = self
            .router
            .perform(|p| async move { p.get_unspent_coins(&puzzle_hash).await })
            .await;

        match result {
            Ok(coins) => {
                self.builder.set_unspent(coins);
                // 可花余额以保留的coin集合为准
                self.wallet.set_balance(
                    AssetKey::Coin,
                    units_to_amount(self.builder.available_amount(), CHIA_DECIMALS),
                );
                self.wallet
                    .remove_pending_older_than(Utc::now(), PENDING_MAX_AGE_SECONDS);
                self.state = ManagerState::Updated;
                info!(
                    coins = self.builder.input_count(),
                    "chia wallet updated"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "chia wallet update failed");
                self.wallet.clear_amounts();
                self.state = ManagerState::Failed;
                Err(e)
            }
        }
    }

    async fn get_fee(
        &mut self,
        _amount: Decimal,
        _destination: &str,
    ) -> Result<Vec<Fee>, WalletError> {
        let cost = self.builder.transaction_cost(true);
        let estimate = self
            .router
            .perform(|p| async move { p.get_fee_estimate(cost).await })
            .await?;
        let raw = units_to_amount(estimate.fee, CHIA_DECIMALS);
        let symbol = self.wallet.blockchain.currency_symbol();
        Ok(spread_fee_tiers(raw, CHIA_DECIMALS)
            .into_iter()
            .map(|value| {
                Fee::with_params(
                    Amount::coin(symbol, value, CHIA_DECIMALS),
                    FeeParams::ChiaCost { cost },
                )
            })
            .collect())
    }

    async fn send(
        &mut self,
        transaction: &Transaction,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionSendResult, WalletError> {
        // 1. 本地构建：余额不足在任何网络调用前失败
        let prepared = self.builder.build_for_sign(transaction)?;

        // 2. 批量签名（每coin一个消息）并聚合
        let signatures = signer
            .sign(&prepared.signing_messages, &self.wallet.public_key)
            .await?;
        let bundle = self.builder.build_for_send(prepared, &signatures)?;
        let hash = bundle.local_id();

        // 3. 广播
        self.router
            .perform(|p| {
                let bundle = bundle.clone();
                async move { p.send_spend_bundle(&bundle).await }
            })
            .await?;
        info!(bundle_id = %hash, "chia spend bundle submitted");
        self.wallet
            .add_pending_transaction(PendingTransaction::from_transaction(
                hash.clone(),
                transaction,
            ));
        Ok(TransactionSendResult { hash })
    }
}
