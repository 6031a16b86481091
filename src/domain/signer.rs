//! 外部签名器契约
//!
//! 签名设备/密钥托管由集成方实现，SDK只消费这个异步接口。
//! 一次调用可携带多个摘要（Chia的多coin spend bundle需要批量签名）。

use async_trait::async_trait;

use crate::error::SignerError;

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// 为每个摘要返回一个签名，顺序与输入一致
    async fn sign(
        &self,
        hashes: &[Vec<u8>],
        public_key: &[u8],
    ) -> Result<Vec<Vec<u8>>, SignerError>;
}
