//! Horizon REST API访问
//!
//! 单请求单响应，不做内部重试；重试与节点切换由FailoverRouter负责。
//! 账户404是业务上有意义的状态（目标账户未创建），转成类型化结果。

use serde::Deserialize;
use tracing::debug;

use crate::domain::amount::Token;
use crate::error::WalletError;
use crate::infrastructure::failover::HostProvider;

/// Horizon账户响应：余额、序列号、子条目数
#[derive(Debug, Clone)]
pub struct StellarAccountInfo {
    pub sequence: i64,
    pub subentry_count: u32,
    /// (asset标识, 余额)，原生币的标识为"native"
    pub balances: Vec<(String, String)>,
}

/// 账户查询结果：404不是错误而是"未创建"
#[derive(Debug, Clone)]
pub enum StellarAccountResponse {
    Found(StellarAccountInfo),
    NotCreated,
}

/// 目标账户检查结果，决定create-account与payment的选择
#[derive(Debug, Clone, Copy)]
pub struct StellarTargetAccount {
    pub exists: bool,
    pub has_trustline: bool,
}

/// 费用统计：实际收取费用的三个分位（stroops）
#[derive(Debug, Clone, Copy)]
pub struct StellarFeeStats {
    pub p50: u64,
    pub p80: u64,
    pub p99: u64,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    sequence: String,
    subentry_count: u32,
    balances: Vec<BalanceDto>,
}

#[derive(Debug, Deserialize)]
struct BalanceDto {
    balance: String,
    asset_type: String,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeeStatsDto {
    fee_charged: FeeChargedDto,
}

#[derive(Debug, Deserialize)]
struct FeeChargedDto {
    p50: String,
    p80: String,
    p99: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponseDto {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct HorizonErrorDto {
    #[serde(default)]
    extras: Option<HorizonErrorExtrasDto>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HorizonErrorExtrasDto {
    #[serde(default)]
    result_codes: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct StellarNetworkProvider {
    client: reqwest::Client,
    host: String,
}

impl HostProvider for StellarNetworkProvider {
    fn host(&self) -> &str {
        &self.host
    }
}

impl StellarNetworkProvider {
    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }

    /// GET /accounts/{id}；404 → NotCreated
    pub async fn get_account(
        &self,
        address: &str,
    ) -> Result<StellarAccountResponse, WalletError> {
        let url = format!("{}/accounts/{}", self.host, address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::from_transport(&self.host, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(address = %address, "stellar account not found on horizon");
            return Ok(StellarAccountResponse::NotCreated);
        }
        let response = self.check_status(response).await?;

        let dto: AccountDto = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        let sequence = dto.sequence.parse::<i64>().map_err(|_| {
            WalletError::malformed(&self.host, format!("bad sequence {}", dto.sequence))
        })?;
        let balances = dto
            .balances
            .into_iter()
            .map(|b| {
                let key = if b.asset_type == "native" {
                    "native".to_string()
                } else {
                    match (b.asset_code, b.asset_issuer) {
                        (Some(code), Some(issuer)) => format!("{code}:{issuer}"),
                        _ => b.asset_type,
                    }
                };
                (key, b.balance)
            })
            .collect();

        Ok(StellarAccountResponse::Found(StellarAccountInfo {
            sequence,
            subentry_count: dto.subentry_count,
            balances,
        }))
    }

    /// 目标账户存在性与信任线检查
    pub async fn check_target_account(
        &self,
        address: &str,
        token: Option<&Token>,
    ) -> Result<StellarTargetAccount, WalletError> {
        match self.get_account(address).await? {
            StellarAccountResponse::NotCreated => Ok(StellarTargetAccount {
                exists: false,
                has_trustline: false,
            }),
            StellarAccountResponse::Found(info) => {
                let has_trustline = match token {
                    Some(token) => info
                        .balances
                        .iter()
                        .any(|(key, _)| key == &token.contract_address),
                    None => false,
                };
                Ok(StellarTargetAccount {
                    exists: true,
                    has_trustline,
                })
            }
        }
    }

    /// GET /fee_stats：fee_charged分位数
    pub async fn get_fee_stats(&self) -> Result<StellarFeeStats, WalletError> {
        let url = format!("{}/fee_stats", self.host);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::from_transport(&self.host, e))?;
        let response = self.check_status(response).await?;

        let dto: FeeStatsDto = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        let parse = |s: &str| {
            s.parse::<u64>()
                .map_err(|_| WalletError::malformed(&self.host, format!("bad fee stat {s}")))
        };
        Ok(StellarFeeStats {
            p50: parse(&dto.fee_charged.p50)?,
            p80: parse(&dto.fee_charged.p80)?,
            p99: parse(&dto.fee_charged.p99)?,
        })
    }

    /// POST /transactions，body为form编码的base64封包
    pub async fn submit_transaction(&self, envelope_xdr: &str) -> Result<String, WalletError> {
        let url = format!("{}/transactions", self.host);
        let response = self
            .client
            .post(&url)
            .form(&[("tx", envelope_xdr)])
            .send()
            .await
            .map_err(|e| WalletError::from_transport(&self.host, e))?;

        let status = response.status();
        if status.is_client_error() {
            // Horizon把链上拒绝编码为400 + result_codes
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<HorizonErrorDto>(&body)
                .ok()
                .and_then(|dto| {
                    dto.extras
                        .and_then(|e| e.result_codes)
                        .map(|codes| codes.to_string())
                        .or(dto.detail)
                })
                .unwrap_or(body);
            return Err(WalletError::rejected(&self.host, message));
        }
        let response = self.check_status(response).await?;

        let dto: SubmitResponseDto = response
            .json()
            .await
            .map_err(|e| WalletError::malformed(&self.host, e.to_string()))?;
        Ok(dto.hash)
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, WalletError> {
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
        Ok(response)
    }
}
