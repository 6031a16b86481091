//! Chia全节点RPC访问
//!
//! 全节点接口统一是POST + JSON，响应里带success标志；
//! success=false且带error是请求级失败。

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::WalletError;
use crate::infrastructure::failover::HostProvider;

use super::transaction_builder::{ChiaSignedSpendBundle, ChiaUnspentCoin};

/// 费用估算结果：每cost的mojo费率换算出的总费（mojo）
#[derive(Debug, Clone, Copy)]
pub struct ChiaFeeEstimate {
    pub fee: u64,
}

#[derive(Debug, Deserialize)]
struct CoinDto {
    parent_coin_info: String,
    puzzle_hash: String,
    amount: u64,
}

#[derive(Debug, Deserialize)]
struct CoinRecordDto {
    coin: CoinDto,
    spent: bool,
}

#[derive(Debug, Deserialize)]
struct CoinRecordsResponseDto {
    success: bool,
    #[serde(default)]
    coin_records: Vec<CoinRecordDto>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushTxResponseDto {
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeeEstimateResponseDto {
    success: bool,
    #[serde(default)]
    estimates: Vec<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CoinJson {
    parent_coin_info: String,
    puzzle_hash: String,
    amount: u64,
}

#[derive(Debug, Serialize)]
struct CoinSpendJson {
    coin: CoinJson,
    puzzle_reveal: String,
    solution: String,
}

#[derive(Clone)]
pub struct ChiaNetworkProvider {
    client: reqwest::Client,
    host: String,
}

impl HostProvider for ChiaNetworkProvider {
    fn host(&self) -> &str {
        &self.host
    }
}

impl ChiaNetworkProvider {
    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }

    /// 按puzzle hash查未花费coin
    pub async fn get_unspent_coins(
        &self,
        puzzle_hash: &[u8; 32],
    ) -> Result<Vec<ChiaUnspentCoin>, WalletError> {
        let body = json!({
            "puzzle_hash": format!("0x{}", hex::encode(puzzle_hash)),
            "include_spent_coins": false,
        });
        let dto: CoinRecordsResponseDto = self
            .post("get_coin_records_by_puzzle_hash", &body)
            .await?;
        if !dto.success {
            return Err(WalletError::malformed(
                &self.host,
                dto.error.unwrap_or_else(|| "unsuccessful response".into()),
            ));
        }
        let mut coins = Vec::with_capacity(dto.coin_records.len());
        for record in dto.coin_records.into_iter().filter(|r| !r.spent) {
            coins.push(ChiaUnspentCoin {
                parent_coin_info: decode_hash(&self.host, &record.coin.parent_coin_info)?,
                puzzle_hash: decode_hash(&self.host, &record.coin.puzzle_hash)?,
                amount: record.coin.amount,
            });
        }
        debug!(count = coins.len(), "fetched unspent chia coins");
        Ok(coins)
    }

    /// 费用估算：给定交易cost，返回目标确认时间内的建议费
    pub async fn get_fee_estimate(&self, cost: u64) -> Result<ChiaFeeEstimate, WalletError> {
        let body = json!({ "cost": cost, "target_times": [60] });
        let dto: FeeEstimateResponseDto = self.post("get_fee_estimate", &body).await?;
        if !dto.success {
            return Err(WalletError::malformed(
                &self.host,
                dto.error.unwrap_or_else(|| "unsuccessful response".into()),
            ));
        }
        let fee = dto.estimates.first().copied().ok_or_else(|| {
            WalletError::malformed(&self.host, "fee estimate response has no estimates")
        })?;
        Ok(ChiaFeeEstimate { fee })
    }

    /// 广播spend bundle
    pub async fn send_spend_bundle(
        &self,
        bundle: &ChiaSignedSpendBundle,
    ) -> Result<(), WalletError> {
        let coin_spends: Vec<CoinSpendJson> = bundle
            .spends
            .iter()
            .map(|spend| CoinSpendJson {
                coin: CoinJson {
                    parent_coin_info: format!("0x{}", hex::encode(spend.coin.parent_coin_info)),
                    puzzle_hash: format!("0x{}", hex::encode(spend.coin.puzzle_hash)),
                    amount: spend.coin.amount,
                },
                puzzle_reveal: format!("0x{}", hex::encode(&spend.puzzle_reveal)),
                solution: format!("0x{}", hex::encode(&spend.solution)),
            })
            .collect();
        let body = json!({
            "spend_bundle": {
                "coin_spends": coin_spends,
                "aggregated_signature": format!("0x{}", hex::encode(bundle.aggregated_signature)),
            }
        });

        let dto: PushTxResponseDto = self.post("push_tx", &body).await?;
        if !dto.success {
            // 节点明确拒绝bundle是请求级错误
            return Err(WalletError::rejected(
                &self.host,
                dto.error
                    .or(dto.status)
                    .unwrap_or_else(|| "spend bundle rejected".into()),
            ));
        }
        Ok(())
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, WalletError> {
        let url = format!("{}/{}", self.host, method);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| WalletError::from_transport(&self.host, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(WalletError::RateLimited {
                host: self.host.clone(),
            });
        }
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
        response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))
    }
}

fn decode_hash(host: &str, value: &str) -> Result<[u8; 32], WalletError> {
    hex::decode(value.trim_start_matches("0x"))
        .ok()
        .and_then(|v| v.try_into().ok())
        .ok_or_else(|| WalletError::malformed(host, format!("bad 32-byte hex {value}")))
}
