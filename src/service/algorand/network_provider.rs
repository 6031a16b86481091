//! algod v2 REST API访问
//!
//! 公共algod节点按API令牌限流。每个节点配一组令牌组成令牌环：
//! 429时先换下一个令牌原地重试，整环耗尽才升级为RateLimited让
//! 路由器切换节点。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::WalletError;
use crate::infrastructure::failover::HostProvider;

const API_TOKEN_HEADER: &str = "X-Algo-API-Token";

/// 账户状态：总额与协议最小余额（µA）
#[derive(Debug, Clone, Copy)]
pub struct AlgorandAccountInfo {
    pub amount: u64,
    pub min_balance: u64,
}

/// 交易参数：发送前拉取的新鲜链状态
#[derive(Debug, Clone)]
pub struct AlgorandTransactionParams {
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub last_round: u64,
    pub suggested_fee: u64,
    pub min_fee: u64,
}

/// 待确认交易查询结果；404是正常状态（交易尚未进入节点视野）
#[derive(Debug, Clone)]
pub enum AlgorandTxStatus {
    Confirmed { round: u64 },
    PoolError(String),
    StillPending,
    NotYetAvailable,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    amount: u64,
    #[serde(rename = "min-balance")]
    min_balance: u64,
}

#[derive(Debug, Deserialize)]
struct TransactionParamsDto {
    #[serde(rename = "genesis-id")]
    genesis_id: String,
    #[serde(rename = "genesis-hash")]
    genesis_hash: String,
    #[serde(rename = "last-round")]
    last_round: u64,
    fee: u64,
    #[serde(rename = "min-fee")]
    min_fee: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponseDto {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct PendingTxDto {
    #[serde(rename = "confirmed-round", default)]
    confirmed_round: Option<u64>,
    #[serde(rename = "pool-error", default)]
    pool_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlgodErrorDto {
    message: String,
}

#[derive(Clone)]
pub struct AlgorandNetworkProvider {
    client: reqwest::Client,
    host: String,
    api_tokens: Vec<String>,
    /// 令牌环下标，克隆共享
    current_token: Arc<AtomicUsize>,
}

impl HostProvider for AlgorandNetworkProvider {
    fn host(&self) -> &str {
        &self.host
    }
}

impl AlgorandNetworkProvider {
    pub fn new(
        client: reqwest::Client,
        host: impl Into<String>,
        api_tokens: Vec<String>,
    ) -> Self {
        Self {
            client,
            host: host.into(),
            api_tokens,
            current_token: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn get_account(&self, address: &str) -> Result<AlgorandAccountInfo, WalletError> {
        let url = format!("{}/v2/accounts/{}", self.host, address);
        let response = self.get_with_token_ring(&url).await?;
        let dto: AccountDto = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        Ok(AlgorandAccountInfo {
            amount: dto.amount,
            min_balance: dto.min_balance,
        })
    }

    pub async fn get_transaction_params(
        &self,
    ) -> Result<AlgorandTransactionParams, WalletError> {
        let url = format!("{}/v2/transactions/params", self.host);
        let response = self.get_with_token_ring(&url).await?;
        let dto: TransactionParamsDto = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        let genesis_hash: [u8; 32] = base64::engine::general_purpose::STANDARD
            .decode(&dto.genesis_hash)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| WalletError::malformed(&self.host, "bad genesis hash"))?;
        Ok(AlgorandTransactionParams {
            genesis_id: dto.genesis_id,
            genesis_hash,
            last_round: dto.last_round,
            suggested_fee: dto.fee,
            min_fee: dto.min_fee,
        })
    }

    /// POST签名交易（二进制msgpack）
    pub async fn submit_transaction(&self, signed: &[u8]) -> Result<String, WalletError> {
        let url = format!("{}/v2/transactions", self.host);
        let mut last_error = None;
        for _ in 0..self.api_tokens.len().max(1) {
            let request = self
                .client
                .post(&url)
                .header("Content-Type", "application/x-binary")
                .body(signed.to_vec());
            let response = self
                .with_token(request)
                .send()
                .await
                .map_err(|e| WalletError::from_transport(&self.host, e))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.rotate_token();
                last_error = Some(WalletError::RateLimited {
                    host: self.host.clone(),
                });
                continue;
            }
            if response.status().is_client_error() {
                // algod把链上拒绝编码为400 + message
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AlgodErrorDto>(&body)
                    .map(|dto| dto.message)
                    .unwrap_or(body);
                return Err(WalletError::rejected(&self.host, message));
            }
            let response = self.check_status(response)?;
            let dto: SubmitResponseDto = response
                .json()
                .await
                .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
            return Ok(dto.tx_id);
        }
        Err(last_error.unwrap_or(WalletError::RateLimited {
            host: self.host.clone(),
        }))
    }

    /// 待确认交易状态；404转成NotYetAvailable
    pub async fn get_pending_transaction(
        &self,
        tx_id: &str,
    ) -> Result<AlgorandTxStatus, WalletError> {
        let url = format!("{}/v2/transactions/pending/{}", self.host, tx_id);
        let request = self.client.get(&url);
        let response = self
            .with_token(request)
            .send()
            .await
            .map_err(|e| WalletError::from_transport(&self.host, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(tx_id = %tx_id, "pending transaction not yet visible on this node");
            return Ok(AlgorandTxStatus::NotYetAvailable);
        }
        let response = self.check_status(response)?;
        let dto: PendingTxDto = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        if let Some(round) = dto.confirmed_round {
            if round > 0 {
                return Ok(AlgorandTxStatus::Confirmed { round });
            }
        }
        if let Some(pool_error) = dto.pool_error {
            if !pool_error.is_empty() {
                return Ok(AlgorandTxStatus::PoolError(pool_error));
            }
        }
        Ok(AlgorandTxStatus::StillPending)
    }

    /// GET请求，429时换令牌原地重试，整环耗尽报RateLimited
    async fn get_with_token_ring(&self, url: &str) -> Result<reqwest::Response, WalletError> {
        for _ in 0..self.api_tokens.len().max(1) {
            let response = self
                .with_token(self.client.get(url))
                .send()
                .await
                .map_err(|e| WalletError::from_transport(&self.host, e))?;
            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!(host = %self.host, "api token rate limited, rotating token");
                self.rotate_token();
                continue;
            }
            return self.check_status(response);
        }
        Err(WalletError::RateLimited {
            host: self.host.clone(),
        })
    }

    fn with_token(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.current_api_token() {
            Some(token) => request.header(API_TOKEN_HEADER, token),
            None => request,
        }
    }

    fn current_api_token(&self) -> Option<&str> {
        if self.api_tokens.is_empty() {
            return None;
        }
        let idx = self.current_token.load(Ordering::Relaxed) % self.api_tokens.len();
        Some(&self.api_tokens[idx])
    }

    fn rotate_token(&self) {
        if !self.api_tokens.is_empty() {
            self.current_token.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, WalletError> {
        let status = response.status();
        if status.is_server_error() {
            return Err(WalletError::NetworkUnavailable {
                host: self.host.clone(),
                reason: format!("http {status}"),
            });
        }
        if !status.is_success() {
            return Err(WalletError::malformed(
                &self.host,
                format!("unexpected http {status}"),
            ));
        }
        Ok(response)
    }
}
