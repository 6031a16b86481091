//! IronWallet - 多链钱包SDK核心
//!
//! 非托管模式：SDK不持有私钥，签名由外部签名器（硬件卡/客户端）完成。
//! 职责范围：地址派生、余额查询、费用估算、链原生格式交易构建、
//! 多节点故障转移、待确认交易跟踪。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{SignerError, WalletError};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        domain::{
            amount::{Amount, AmountType, Token},
            signer::TransactionSigner,
            transaction::{Fee, PendingTransaction, Transaction, TransactionStatus},
            wallet::{Blockchain, Wallet},
        },
        error::{SignerError, WalletError},
        service::{ManagerState, TransactionSendResult, WalletManager},
    };
}
