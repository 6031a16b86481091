//! 共享HTTP客户端构建
//!
//! 所有provider共用一个带超时的reqwest::Client，超时参数来自NetworkConfig。

use std::time::Duration;

use crate::config::NetworkConfig;

/// 按配置构建HTTP客户端；构建失败时回退到默认客户端
pub fn build_client(config: &NetworkConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_from_defaults() {
        // 默认配置必须能构建出客户端
        let _client = build_client(&NetworkConfig::default());
    }
}
