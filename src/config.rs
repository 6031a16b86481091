//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// SDK配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub stellar: ChainEndpoints,
    pub algorand: AlgorandEndpoints,
    pub chia: ChiaEndpoints,
    pub sui: ChainEndpoints,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// HTTP传输配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// 通用链节点配置：按优先级排列的冗余节点列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEndpoints {
    pub urls: Vec<String>,
    #[serde(default)]
    pub testnet: bool,
}

/// Algorand节点配置：每个节点可携带一组轮换API令牌
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorandEndpoints {
    pub nodes: Vec<AlgorandNode>,
    #[serde(default)]
    pub testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorandNode {
    pub url: String,
    /// 限流时按顺序轮换的API令牌（可为空）
    #[serde(default)]
    pub api_tokens: Vec<String>,
}

/// Chia全节点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChiaEndpoints {
    pub urls: Vec<String>,
    #[serde(default)]
    pub testnet: bool,
}

impl SdkConfig {
    /// 从TOML文件加载配置，环境变量可覆盖日志级别
    ///
    /// # 流程
    /// 1. 读取 .env（如存在）
    /// 2. 解析TOML配置文件
    /// 3. 应用 IRONWALLET_LOG_LEVEL 环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let mut config: SdkConfig = toml::from_str(&raw).context("invalid TOML config")?;

        if let Ok(level) = std::env::var("IRONWALLET_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验配置完整性：每条链至少需要一个节点
    pub fn validate(&self) -> Result<()> {
        if self.stellar.urls.is_empty() {
            anyhow::bail!("stellar: at least one horizon endpoint is required");
        }
        if self.algorand.nodes.is_empty() {
            anyhow::bail!("algorand: at least one algod endpoint is required");
        }
        if self.chia.urls.is_empty() {
            anyhow::bail!("chia: at least one full node endpoint is required");
        }
        if self.sui.urls.is_empty() {
            anyhow::bail!("sui: at least one rpc endpoint is required");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [logging]
        level = "debug"
        format = "text"

        [stellar]
        urls = ["https://horizon.stellar.org"]

        [algorand]
        nodes = [{ url = "https://mainnet-api.algonode.cloud", api_tokens = ["k1", "k2"] }]

        [chia]
        urls = ["https://chia.example.com"]

        [sui]
        urls = ["https://fullnode.mainnet.sui.io"]
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config: SdkConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.stellar.urls.len(), 1);
        assert_eq!(config.algorand.nodes[0].api_tokens.len(), 2);
        assert!(!config.sui.testnet);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_endpoints_rejected() {
        let mut config: SdkConfig = toml::from_str(SAMPLE).unwrap();
        config.chia.urls.clear();
        assert!(config.validate().is_err());
    }
}
