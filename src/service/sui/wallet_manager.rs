//! Sui钱包管理器
//!
//! 余额分两路：gas coin（原生SUI）与token coin对象。待确认交易
//! 通过交易状态接口轮询推进。

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::amount::Amount;
use crate::domain::signer::TransactionSigner;
use crate::domain::transaction::{Fee, FeeParams, PendingTransaction, Transaction, TransactionStatus};
use crate::domain::wallet::{AssetKey, Wallet};
use crate::error::{SignerError, WalletError};
use crate::infrastructure::failover::FailoverRouter;
use crate::service::{ManagerState, TransactionSendResult, WalletManager};
use crate::utils::amount_converter::units_to_amount;

use super::network_provider::{SuiNetworkProvider, SuiTxStatus};
use super::transaction_builder::{
    SuiTransactionBuilder, COIN_TRANSFER_GAS_BUDGET, SUI_DECIMALS, TOKEN_TRANSFER_GAS_BUDGET,
};

/// 状态长期查不到的交易按老化移除（秒）
const PENDING_EXPIRY_SECONDS: i64 = 600;

pub struct SuiWalletManager {
    wallet: Wallet,
    builder: SuiTransactionBuilder,
    router: FailoverRouter<SuiNetworkProvider>,
    state: ManagerState,
}

impl SuiWalletManager {
    pub fn new(
        wallet: Wallet,
        router: FailoverRouter<SuiNetworkProvider>,
    ) -> Result<Self, WalletError> {
        let builder = SuiTransactionBuilder::new(&wallet.public_key)?;
        Ok(Self {
            wallet,
            builder,
            router,
            state: ManagerState::Idle,
        })
    }

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
                    async move { p.get_transaction_status(&hash).await }
                })
                .await;
            match result {
                Ok(SuiTxStatus::Success) => {
                    info!(digest = %hash, "sui transaction confirmed");
                    self.wallet.resolve_pending(&hash, TransactionStatus::Confirmed);
                }
                Ok(SuiTxStatus::Failure(reason)) => {
                    warn!(digest = %hash, reason = %reason, "sui transaction failed on chain");
                    self.wallet.resolve_pending(&hash, TransactionStatus::Removed);
                }
                Ok(SuiTxStatus::NotFound) => {}
                Err(e) => {
                    warn!(digest = %hash, error = %e, "pending status poll failed");
                }
            }
        }
        self.wallet
            .remove_pending_older_than(Utc::now(), PENDING_EXPIRY_SECONDS);
    }
}

#[async_trait]
impl WalletManager for SuiWalletManager {
    fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    fn state(&self) -> ManagerState {
        self.state
    }

    async fn update(&mut self) -> Result<(), WalletError> {
        self.state = ManagerState::Updating;
        let owner = self.builder.address();
        let result = self
            .router
            .perform(|p| {
                let owner = owner.clone();
                async move { p.get_coins(&owner).await }
            })
            .await;

        match result {
            Ok(coins) => {
                self.builder.set_coins(coins);
                self.wallet.set_balance(
                    AssetKey::Coin,
                    units_to_amount(self.builder.gas_balance(), SUI_DECIMALS),
                );
                let tokens = self.wallet.tokens.clone();
                for token in tokens {
                    let balance = self.builder.token_balance(&token.contract_address);
                    self.wallet.set_balance(
                        AssetKey::Token(token.contract_address.clone()),
                        units_to_amount(balance, token.decimals),
                    );
                }
                self.refresh_pending().await;
                self.state = ManagerState::Updated;
                info!(address = %owner, "sui wallet updated");
                Ok(())
            }
            Err(e) => {
                warn!(address = %owner, error = %e, "sui wallet update failed");
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
        let gas_price = self
            .router
            .perform(|p| async move { p.get_reference_gas_price().await })
            .await?;
        let symbol = self.wallet.blockchain.currency_symbol();
        // 两档预算：原生币转账与代币转账
        Ok([COIN_TRANSFER_GAS_BUDGET, TOKEN_TRANSFER_GAS_BUDGET]
            .into_iter()
            .map(|budget| {
                Fee::with_params(
                    Amount::coin(
                        symbol,
                        units_to_amount(budget, SUI_DECIMALS),
                        SUI_DECIMALS,
                    ),
                    FeeParams::SuiGas {
                        gas_price,
                        gas_budget: budget,
                    },
                )
            })
            .collect())
    }

    async fn send(
        &mut self,
        transaction: &Transaction,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionSendResult, WalletError> {
        // 1. gas价格：优先用fee参数里缓存的，否则现查
        let gas_price = match &transaction.fee.params {
            Some(FeeParams::SuiGas { gas_price, .. }) => *gas_price,
            _ => {
                self.router
                    .perform(|p| async move { p.get_reference_gas_price().await })
                    .await?
            }
        };

        // 2. 构建 → 签名 → 组装
        let prepared = self.builder.build_for_sign(transaction, gas_price)?;
        let signatures = signer
            .sign(&[prepared.digest.to_vec()], &self.wallet.public_key)
            .await?;
        let signature = signatures
            .first()
            .ok_or_else(|| SignerError::Failed("signer returned no signature".into()))?;
        let signed = self.builder.build_for_send(&prepared, signature)?;

        // 3. 广播
        let digest = self
            .router
            .perform(|p| {
                let signed = signed.clone();
                async move { p.execute_transaction_block(&signed).await }
            })
            .await?;
        info!(digest = %digest, "sui transaction submitted");
        self.wallet
            .add_pending_transaction(PendingTransaction::from_transaction(
                digest.clone(),
                transaction,
            ));
        Ok(TransactionSendResult { hash: digest })
    }
}
