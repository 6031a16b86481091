//! 统一错误分类
//!
//! 四类错误：构建错误（本地、不可重试）、节点级错误（路由器轮换重试）、
//! 请求级错误（链拒绝，原样透出）、签名器错误（含用户取消）。

use rust_decimal::Decimal;
use thiserror::Error;

/// 外部签名器错误
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    /// 用户在签名设备上取消了操作
    #[error("signing cancelled by user")]
    UserCancelled,

    #[error("signer failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum WalletError {
    // ---- 构建错误（本地、不可重试） ----
    /// 交易无法构建（字段非法、目标账户状态不满足等）
    #[error("failed to build transaction: {0}")]
    FailedToBuildTransaction(String),

    /// 该链不支持此金额类型（如对仅支持coin/token的链传入feeResource）
    #[error("unsupported amount type for this blockchain")]
    UnsupportedAmountType,

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    /// gas币余额不足以覆盖gas预算（区别于余额不足）
    #[error("gas coin balance insufficient: required {required}, available {available}")]
    InsufficientGasBalance { required: u64, available: u64 },

    /// 序列号尚未加载（update尚未成功过）
    #[error("account sequence is not loaded yet")]
    SequenceNotLoaded,

    /// 目标账户尚未创建，且金额不满足链上最小创建储备
    #[error("destination account is not created, minimum reserve is {min_reserve}")]
    AccountNotCreated { min_reserve: Decimal },

    /// SDK配置或构造参数非法（如空节点列表）
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    // ---- 节点级错误（路由器轮换重试） ----
    #[error("network unavailable on {host}: {reason}")]
    NetworkUnavailable { host: String, reason: String },

    /// 节点返回了无法解析的响应
    #[error("malformed response from {host}: {reason}")]
    InvalidResponse { host: String, reason: String },

    /// 所有备用API令牌均被限流
    #[error("rate limited on {host}")]
    RateLimited { host: String },

    /// 所有节点都已尝试且失败
    #[error("all providers exhausted, last host {last_host}: {reason}")]
    ProvidersExhausted { last_host: String, reason: String },

    // ---- 请求级错误（不轮换，原样透出） ----
    /// 链拒绝了交易（余额不足、签名错误、序列号过期等）
    #[error("transaction rejected by {}: {message}", host.as_deref().unwrap_or("node"))]
    TransactionRejected {
        host: Option<String>,
        message: String,
    },

    // ---- 签名器错误 ----
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl WalletError {
    /// 路由器的唯一分类入口：true表示应轮换到下一个节点重试
    pub fn is_provider_level(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable { .. } | Self::InvalidResponse { .. } | Self::RateLimited { .. }
        )
    }

    /// 从reqwest传输错误构造节点级错误
    pub fn from_transport(host: &str, err: reqwest::Error) -> Self {
        Self::NetworkUnavailable {
            host: host.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn malformed(host: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    pub fn rejected(host: &str, message: impl Into<String>) -> Self {
        Self::TransactionRejected {
            host: Some(host.to_string()),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 节点级错误分类：传输/响应/限流错误应触发轮换
    #[test]
    fn test_provider_level_classification() {
        let network = WalletError::NetworkUnavailable {
            host: "h1".into(),
            reason: "timeout".into(),
        };
        let malformed = WalletError::malformed("h1", "bad json");
        let rate_limited = WalletError::RateLimited { host: "h1".into() };

        assert!(network.is_provider_level());
        assert!(malformed.is_provider_level());
        assert!(rate_limited.is_provider_level());
    }

    /// 请求级和构建错误不应触发轮换
    #[test]
    fn test_request_level_classification() {
        let rejected = WalletError::rejected("h1", "tx_bad_seq");
        let build = WalletError::FailedToBuildTransaction("no memo".into());
        let config = WalletError::InvalidConfiguration("no providers".into());
        let signer = WalletError::Signer(SignerError::UserCancelled);

        assert!(!rejected.is_provider_level());
        assert!(!build.is_provider_level());
        assert!(!config.is_provider_level());
        assert!(!signer.is_provider_level());
    }
}
