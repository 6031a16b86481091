//! Algorand钱包管理器
//!
//! 储备规则：协议最小余额（基础100000µA，随资产/应用增长），由
//! 账户接口直接返回。待确认交易轮询algod的pending接口推进状态，
//! 长时间不可见时按有效窗口过期兜底移除。

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::amount::Amount;
use crate::domain::signer::TransactionSigner;
use crate::domain::transaction::{Fee, PendingTransaction, Transaction, TransactionStatus};
use crate::domain::wallet::{AssetKey, Wallet};
use crate::error::{SignerError, WalletError};
use crate::infrastructure::failover::FailoverRouter;
use crate::service::{ManagerState, TransactionSendResult, WalletManager};
use crate::utils::amount_converter::units_to_amount;

use super::network_provider::{AlgorandNetworkProvider, AlgorandTxStatus};
use super::transaction_builder::{
    AlgorandBuildParams, AlgorandTransactionBuilder, ALGORAND_DECIMALS, ROUND_WINDOW,
};

/// 有效窗口1000轮、每轮约3秒：超过这个时间仍不可见的交易视为已过期
const PENDING_EXPIRY_SECONDS: i64 = ROUND_WINDOW as i64 * 3;

pub struct AlgorandWalletManager {
    wallet: Wallet,
    builder: AlgorandTransactionBuilder,
    router: FailoverRouter<AlgorandNetworkProvider>,
    state: ManagerState,
}

impl AlgorandWalletManager {
    pub fn new(
        wallet: Wallet,
        router: FailoverRouter<AlgorandNetworkProvider>,
    ) -> Result<Self, WalletError> {
        let builder = AlgorandTransactionBuilder::new(&wallet.public_key)?;
        Ok(Self {
            wallet,
            builder,
            router,
            state: ManagerState::Idle,
        })
    }

    /// 逐笔轮询待确认交易并推进状态
    async fn refresh_pending(&mut self) {
        let hashes: Vec<String> = self
            .wallet
            .pending_transactions()
            .iter()
            .map(|p| p.hash.clone())
            .collect();
        for hash in hashes {
            let result = self
                .router
                .perform(|p| {
                    let hash = hash.clone();
                    async move { p.get_pending_transaction(&hash).await }
                })
                .await;
            match result {
                Ok(AlgorandTxStatus::Confirmed { round }) => {
                    info!(tx_id = %hash, round = round, "algorand transaction confirmed");
                    self.wallet.resolve_pending(&hash, TransactionStatus::Confirmed);
                }
                Ok(AlgorandTxStatus::PoolError(reason)) => {
                    warn!(tx_id = %hash, reason = %reason, "algorand transaction dropped from pool");
                    self.wallet.resolve_pending(&hash, TransactionStatus::Removed);
                }
                Ok(AlgorandTxStatus::StillPending) | Ok(AlgorandTxStatus::NotYetAvailable) => {}
                Err(e) => {
                    // 状态轮询失败不阻塞update，下一轮再试
                    warn!(tx_id = %hash, error = %e, "pending status poll failed");
                }
            }
        }
        // 有效窗口过期兜底
        self.wallet
            .remove_pending_older_than(Utc::now(), PENDING_EXPIRY_SECONDS);
    }
}

#[async_trait]
impl WalletManager for AlgorandWalletManager {
    fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    fn state(&self) -> ManagerState {
        self.state
    }

    async fn update(&mut self) -> Result<(), WalletError> {
        self.state = ManagerState::Updating;
        let address = self.wallet.address().to_string();
        let result = self
            .router
            .perform(|p| {
                let address = address.clone();
                async move { p.get_account(&address).await }
            })
            .await;

        match result {
            Ok(info) => {
                let reserve = units_to_amount(info.min_balance, ALGORAND_DECIMALS);
                let spendable = info.amount.saturating_sub(info.min_balance);
                self.wallet.set_balance(
                    AssetKey::Coin,
                    units_to_amount(spendable, ALGORAND_DECIMALS),
                );
                self.wallet.set_balance(AssetKey::Reserve, reserve);
                self.refresh_pending().await;
                self.state = ManagerState::Updated;
                info!(address = %address, "algorand wallet updated");
                Ok(())
            }
            Err(e) => {
                warn!(address = %address, error = %e, "algorand wallet update failed");
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
        let params = self
            .router
            .perform(|p| async move { p.get_transaction_params().await })
            .await?;
        // 单档：建议费以协议最小费兜底
        let fee = params.suggested_fee.max(params.min_fee);
        Ok(vec![Fee::new(Amount::coin(
            self.wallet.blockchain.currency_symbol(),
            units_to_amount(fee, ALGORAND_DECIMALS),
            ALGORAND_DECIMALS,
        ))])
    }

    async fn send(
        &mut self,
        transaction: &Transaction,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionSendResult, WalletError> {
        // 1. 发送前拉取新鲜的轮次与创世参数
        let params = self
            .router
            .perform(|p| async move { p.get_transaction_params().await })
            .await?;
        let build_params = AlgorandBuildParams {
            genesis_id: params.genesis_id,
            genesis_hash: params.genesis_hash,
            first_round: params.last_round,
            min_fee: params.min_fee,
        };

        // 2. 构建 → 签名 → 组装
        let prepared = self.builder.build_for_sign(transaction, &build_params)?;
        let signatures = signer
            .sign(&[prepared.digest.clone()], &self.wallet.public_key)
            .await?;
        let signature = signatures
            .first()
            .ok_or_else(|| SignerError::Failed("signer returned no signature".into()))?;
        let signed = self.builder.build_for_send(&prepared, signature)?;

        // 3. 广播并记入待确认列表
        let tx_id = self
            .router
            .perform(|p| {
                let signed = signed.clone();
                async move { p.submit_transaction(&signed).await }
            })
            .await?;
        info!(tx_id = %tx_id, "algorand transaction submitted");
        self.wallet
            .add_pending_transaction(PendingTransaction::from_transaction(
                tx_id.clone(),
                transaction,
            ));
        Ok(TransactionSendResult { hash: tx_id })
    }
}
