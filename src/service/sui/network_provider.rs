//! Sui JSON-RPC 2.0访问
//!
//! RPC错误对象是请求级失败（节点理解了请求但链拒绝了它）；
//! 传输错误与解析错误才触发节点轮换。

use serde::Deserialize;
use serde_json::json;

use crate::error::WalletError;
use crate::infrastructure::failover::HostProvider;

use super::transaction_builder::{SuiCoinObject, SuiSignedTransaction};

/// 交易执行状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiTxStatus {
    Success,
    Failure(String),
    NotFound,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct RpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CoinPageDto {
    data: Vec<CoinDto>,
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinDto {
    #[serde(rename = "coinType")]
    coin_type: String,
    #[serde(rename = "coinObjectId")]
    coin_object_id: String,
    version: String,
    digest: String,
    balance: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponseDto {
    digest: String,
}

#[derive(Debug, Deserialize)]
struct TxBlockDto {
    #[serde(default)]
    effects: Option<TxEffectsDto>,
}

#[derive(Debug, Deserialize)]
struct TxEffectsDto {
    status: TxStatusDto,
}

#[derive(Debug, Deserialize)]
struct TxStatusDto {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct SuiNetworkProvider {
    client: reqwest::Client,
    host: String,
}

impl HostProvider for SuiNetworkProvider {
    fn host(&self) -> &str {
        &self.host
    }
}

impl SuiNetworkProvider {
    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }

    /// 拉取地址下全部coin对象（跟随分页游标）
    pub async fn get_coins(&self, owner: &str) -> Result<Vec<SuiCoinObject>, WalletError> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: CoinPageDto = self
                .call(
                    "suix_getAllCoins",
                    json!([owner, cursor, 50]),
                )
                .await?;
            for dto in page.data {
                coins.push(self.parse_coin(dto)?);
            }
            if !page.has_next_page {
                break;
            }
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        Ok(coins)
    }

    pub async fn get_reference_gas_price(&self) -> Result<u64, WalletError> {
        let price: String = self.call("suix_getReferenceGasPrice", json!([])).await?;
        price
            .parse::<u64>()
            .map_err(|_| WalletError::malformed(&self.host, format!("bad gas price {price}")))
    }

    pub async fn execute_transaction_block(
        &self,
        signed: &SuiSignedTransaction,
    ) -> Result<String, WalletError> {
        let dto: ExecuteResponseDto = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    signed.tx_bytes_b64,
                    [signed.signature_b64],
                    { "showEffects": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await?;
        Ok(dto.digest)
    }

    /// 交易状态查询；链上查不到返回NotFound
    pub async fn get_transaction_status(
        &self,
        digest: &str,
    ) -> Result<SuiTxStatus, WalletError> {
        let result: Result<TxBlockDto, WalletError> = self
            .call(
                "sui_getTransactionBlock",
                json!([digest, { "showEffects": true }]),
            )
            .await;
        match result {
            Ok(dto) => match dto.effects {
                Some(effects) if effects.status.status == "success" => Ok(SuiTxStatus::Success),
                Some(effects) => Ok(SuiTxStatus::Failure(
                    effects.status.error.unwrap_or_else(|| "execution failed".into()),
                )),
                None => Ok(SuiTxStatus::NotFound),
            },
            // 未找到交易以RPC错误返回
            Err(WalletError::TransactionRejected { message, .. })
                if message.contains("Could not find") =>
            {
                Ok(SuiTxStatus::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    fn parse_coin(&self, dto: CoinDto) -> Result<SuiCoinObject, WalletError> {
        let object_id: [u8; 32] = hex::decode(dto.coin_object_id.trim_start_matches("0x"))
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| {
                WalletError::malformed(&self.host, format!("bad object id {}", dto.coin_object_id))
            })?;
        let digest = bs58::decode(&dto.digest).into_vec().map_err(|_| {
            WalletError::malformed(&self.host, format!("bad object digest {}", dto.digest))
        })?;
        let version = dto.version.parse::<u64>().map_err(|_| {
            WalletError::malformed(&self.host, format!("bad version {}", dto.version))
        })?;
        let balance = dto.balance.parse::<u64>().map_err(|_| {
            WalletError::malformed(&self.host, format!("bad balance {}", dto.balance))
        })?;
        Ok(SuiCoinObject {
            object_id,
            version,
            digest,
            balance,
            coin_type: dto.coin_type,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.host)
            .json(&body)
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
        let dto: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        if let Some(error) = dto.error {
            return Err(WalletError::rejected(
                &self.host,
                format!("rpc error {}: {}", error.code, error.message),
            ));
        }
        dto.result
            .ok_or_else(|| WalletError::malformed(&self.host, "rpc response has no result"))
    }
}
