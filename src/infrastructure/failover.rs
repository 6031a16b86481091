//! 多provider故障转移路由
//!
//! 同一条链配置多个节点，路由器粘性地停留在当前节点上；只有
//! provider级错误（网络不可达、5xx、响应格式错误、限流耗尽）才切换到
//! 下一个节点重试，链明确拒绝交易等请求级错误立即透传，绝不换节点重发。

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

use crate::error::WalletError;

/// 可路由的provider：暴露host用于日志与错误归属
pub trait HostProvider {
    fn host(&self) -> &str;
}

pub struct FailoverRouter<P> {
    providers: Vec<P>,
    /// 当前节点下标，跨调用粘性保持
    current: AtomicUsize,
}

impl<P: HostProvider + Clone> FailoverRouter<P> {
    pub fn new(providers: Vec<P>) -> Result<Self, WalletError> {
        if providers.is_empty() {
            return Err(WalletError::InvalidConfiguration(
                "failover router requires at least one provider".into(),
            ));
        }
        Ok(Self {
            providers,
            current: AtomicUsize::new(0),
        })
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn current_host(&self) -> &str {
        let idx = self.current.load(Ordering::Relaxed) % self.providers.len();
        self.providers[idx].host()
    }

    /// 在当前节点上执行op，provider级失败时轮转节点，最多尝试N次
    pub async fn perform<T, F, Fut>(&self, op: F) -> Result<T, WalletError>
    where
        F: Fn(P) -> Fut,
        Fut: std::future::Future<Output = Result<T, WalletError>>,
    {
        let count = self.providers.len();
        let mut last_failure: Option<(String, WalletError)> = None;

        for attempt in 0..count {
            let idx = self.current.load(Ordering::Relaxed) % count;
            let provider = self.providers[idx].clone();
            let host = provider.host().to_string();

            match op(provider).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_provider_level() => {
                    warn!(
                        host = %host,
                        attempt = attempt + 1,
                        error = %e,
                        "provider failed, rotating to next host"
                    );
                    // 粘性切换：下一次调用从新节点开始
                    self.current.store((idx + 1) % count, Ordering::Relaxed);
                    last_failure = Some((host, e));
                }
                // 请求级错误：链拒绝了交易本身，换节点重发没有意义
                Err(e) => return Err(e),
            }
        }

        let (last_host, reason) = last_failure
            .map(|(host, e)| (host, e.to_string()))
            .unwrap_or_else(|| (self.current_host().to_string(), "no attempt made".into()));
        Err(WalletError::ProvidersExhausted { last_host, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as Counter;
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockProvider {
        host: String,
        fail_provider_level: bool,
        fail_request_level: bool,
        calls: Arc<Counter>,
    }

    impl MockProvider {
        fn new(host: &str, fail_provider_level: bool, fail_request_level: bool) -> Self {
            Self {
                host: host.into(),
                fail_provider_level,
                fail_request_level,
                calls: Arc::new(Counter::new(0)),
            }
        }

        async fn fetch(&self) -> Result<String, WalletError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_provider_level {
                return Err(WalletError::NetworkUnavailable {
                    host: self.host.clone(),
                    reason: "connection refused".into(),
                });
            }
            if self.fail_request_level {
                return Err(WalletError::rejected(&self.host, "tx_bad_seq"));
            }
            Ok(format!("ok from {}", self.host))
        }
    }

    impl HostProvider for MockProvider {
        fn host(&self) -> &str {
            &self.host
        }
    }

    /// 前两个节点网络故障，第三个成功；current粘在第三个节点上
    #[tokio::test]
    async fn test_rotates_past_failing_providers_and_sticks() {
        let providers = vec![
            MockProvider::new("https://node1", true, false),
            MockProvider::new("https://node2", true, false),
            MockProvider::new("https://node3", false, false),
        ];
        let router = FailoverRouter::new(providers).unwrap();

        let result = router.perform(|p| async move { p.fetch().await }).await;
        assert_eq!(result.unwrap(), "ok from https://node3");
        assert_eq!(router.current_host(), "https://node3");

        // 第二次调用直接命中第三个节点
        let result = router.perform(|p| async move { p.fetch().await }).await;
        assert_eq!(result.unwrap(), "ok from https://node3");
        assert_eq!(router.current_host(), "https://node3");
    }

    /// 请求级错误立即透传，不轮转节点
    #[tokio::test]
    async fn test_request_level_error_does_not_rotate() {
        let second = MockProvider::new("https://node2", false, false);
        let second_calls = second.calls.clone();
        let providers = vec![MockProvider::new("https://node1", false, true), second];
        let router = FailoverRouter::new(providers).unwrap();

        let result = router.perform(|p| async move { p.fetch().await }).await;
        assert!(matches!(
            result,
            Err(WalletError::TransactionRejected { .. })
        ));
        assert_eq!(router.current_host(), "https://node1");
        assert_eq!(second_calls.load(Ordering::Relaxed), 0);
    }

    /// 全部节点故障：最多N次尝试后带最后host报错
    #[tokio::test]
    async fn test_all_providers_exhausted() {
        let providers = vec![
            MockProvider::new("https://node1", true, false),
            MockProvider::new("https://node2", true, false),
        ];
        let router = FailoverRouter::new(providers).unwrap();

        let result: Result<String, _> = router.perform(|p| async move { p.fetch().await }).await;
        match result {
            Err(WalletError::ProvidersExhausted { last_host, reason }) => {
                assert_eq!(last_host, "https://node2");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_provider_list_rejected() {
        assert!(matches!(
            FailoverRouter::<MockProvider>::new(vec![]),
            Err(WalletError::InvalidConfiguration(_))
        ));
    }
}
