//! Stellar钱包管理器
//!
//! 储备规则：base reserve 0.5 XLM × (2 + 子条目数)，展示余额扣除储备。
//! Horizon不提供轻量的交易状态轮询，待确认交易按10秒老化视为已确认
//! （近似处理）。

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{info, warn};

use crate::domain::amount::{Amount, AmountType};
use crate::domain::signer::TransactionSigner;
use crate::domain::transaction::{Fee, PendingTransaction, Transaction};
use crate::domain::wallet::{AssetKey, Wallet};
use crate::error::{SignerError, WalletError};
use crate::infrastructure::failover::FailoverRouter;
use crate::service::{ManagerState, TransactionSendResult, WalletManager};
use crate::utils::amount_converter::units_to_amount;

use super::network_provider::{StellarAccountResponse, StellarNetworkProvider};
use super::transaction_builder::{StellarTransactionBuilder, STELLAR_DECIMALS};

/// 每个账户槽位的基础储备（XLM）
const BASE_RESERVE: &str = "0.5";
/// 创建新账户的最小转账额（XLM）
const MIN_AMOUNT_TO_CREATE_ACCOUNT: u32 = 1;
/// 待确认交易老化阈值（秒）
const PENDING_MAX_AGE_SECONDS: i64 = 10;

pub struct StellarWalletManager {
    wallet: Wallet,
    builder: StellarTransactionBuilder,
    router: FailoverRouter<StellarNetworkProvider>,
    state: ManagerState,
}

impl StellarWalletManager {
    pub fn new(
        wallet: Wallet,
        router: FailoverRouter<StellarNetworkProvider>,
    ) -> Result<Self, WalletError> {
        let builder =
            StellarTransactionBuilder::new(&wallet.public_key, wallet.blockchain.is_testnet())?;
        Ok(Self {
            wallet,
            builder,
            router,
            state: ManagerState::Idle,
        })
    }

    fn base_reserve() -> Decimal {
        // 常量字符串解析不会失败
        Decimal::from_str(BASE_RESERVE).unwrap_or_default()
    }

    fn apply_account(
        &mut self,
        sequence: i64,
        subentry_count: u32,
        balances: Vec<(String, String)>,
    ) -> Result<(), WalletError> {
        let host = self.router.current_host().to_string();
        let parse = |s: &str| {
            Decimal::from_str(s)
                .map_err(|_| WalletError::malformed(&host, format!("bad balance {s}")))
        };

        // 储备 = 0.5 × (2 + 子条目数)
        let reserve = Self::base_reserve() * Decimal::from(2 + subentry_count);
        for (key, value) in balances {
            if key == "native" {
                let total = parse(&value)?;
                self.wallet
                    .set_balance(AssetKey::Coin, (total - reserve).max(Decimal::ZERO));
            } else if self.wallet.tokens.iter().any(|t| t.contract_address == key) {
                let balance = parse(&value)?;
                self.wallet.set_balance(AssetKey::Token(key), balance);
            }
        }
        self.wallet.set_balance(AssetKey::Reserve, reserve);
        self.builder.set_sequence(sequence);
        Ok(())
    }
}

#[async_trait]
impl WalletManager for StellarWalletManager {
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
            Ok(StellarAccountResponse::Found(info)) => {
                self.apply_account(info.sequence, info.subentry_count, info.balances)?;
                self.wallet
                    .remove_pending_older_than(Utc::now(), PENDING_MAX_AGE_SECONDS);
                self.state = ManagerState::Updated;
                info!(address = %address, "stellar wallet updated");
                Ok(())
            }
            Ok(StellarAccountResponse::NotCreated) => {
                self.wallet.clear_amounts();
                self.state = ManagerState::Failed;
                Err(WalletError::AccountNotCreated {
                    min_reserve: Decimal::from(MIN_AMOUNT_TO_CREATE_ACCOUNT),
                })
            }
            Err(e) => {
                warn!(address = %address, error = %e, "stellar wallet update failed");
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
        let stats = self
            .router
            .perform(|p| async move { p.get_fee_stats().await })
            .await?;
        let symbol = self.wallet.blockchain.currency_symbol();
        Ok([stats.p50, stats.p80, stats.p99]
            .into_iter()
            .map(|stroops| {
                Fee::new(Amount::coin(
                    symbol,
                    units_to_amount(stroops, STELLAR_DECIMALS),
                    STELLAR_DECIMALS,
                ))
            })
            .collect())
    }

    async fn send(
        &mut self,
        transaction: &Transaction,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionSendResult, WalletError> {
        // 1. 目标账户状态决定操作类型与前置校验
        let token = match &transaction.amount.amount_type {
            AmountType::Token(token) => Some(token.clone()),
            _ => None,
        };
        let destination = transaction.destination_address.clone();
        let target = self
            .router
            .perform(|p| {
                let destination = destination.clone();
                let token = token.clone();
                async move { p.check_target_account(&destination, token.as_ref()).await }
            })
            .await?;

        if !target.exists
            && transaction.amount.is_coin()
            && transaction.amount.value < Decimal::from(MIN_AMOUNT_TO_CREATE_ACCOUNT)
        {
            return Err(WalletError::AccountNotCreated {
                min_reserve: Decimal::from(MIN_AMOUNT_TO_CREATE_ACCOUNT),
            });
        }
        if target.exists && token.is_some() && !target.has_trustline {
            return Err(WalletError::FailedToBuildTransaction(
                "destination account has no trustline for this asset".into(),
            ));
        }

        // 2. 构建 → 签名 → 组装
        let prepared =
            self.builder
                .build_for_sign(transaction, target.exists, Utc::now().timestamp())?;
        let signatures = signer
            .sign(&[prepared.digest.to_vec()], &self.wallet.public_key)
            .await?;
        let signature = signatures
            .first()
            .ok_or_else(|| SignerError::Failed("signer returned no signature".into()))?;
        let envelope = self.builder.build_for_send(&prepared, signature)?;

        // 3. 广播并记入待确认列表
        let hash = self
            .router
            .perform(|p| {
                let envelope = envelope.clone();
                async move { p.submit_transaction(&envelope).await }
            })
            .await?;
        info!(hash = %hash, "stellar transaction submitted");
        self.wallet
            .add_pending_transaction(PendingTransaction::from_transaction(
                hash.clone(),
                transaction,
            ));
        Ok(TransactionSendResult { hash })
    }
}
