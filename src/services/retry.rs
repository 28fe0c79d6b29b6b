//! 统一的重试逻辑
//!
//! 连接类错误使用较长的指数退避，其他错误使用较短的线性退避。
//! 第一次尝试之前和最后一次尝试之后都不等待。

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{MarketDataError, ProviderError};

/// 日志中错误信息的最大长度
const MAX_LOG_MESSAGE_CHARS: usize = 200;

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 基础延迟
    pub base_delay: Duration,
    /// 连接类错误的退避上限
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    ///
    /// - 连接类：`2 × base × 2^(attempt-1)`，不超过上限
    /// - 其他：`base × attempt`
    pub fn backoff_delay(&self, error: &ProviderError, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        if error.is_connection_class() {
            let factor = 2f64 * 2f64.powi(attempt as i32 - 1);
            let delay = self.base_delay.mul_f64(factor.min(u32::MAX as f64));
            delay.min(self.max_delay)
        } else {
            self.base_delay.saturating_mul(attempt)
        }
    }

    /// 执行一次数据源调用，失败时按策略重试
    ///
    /// `call` 返回 `Ok(None)` 视为空结果，按非连接类失败处理：
    /// 同样按 `base × attempt` 等待后再重试，不立即重发，
    /// 避免上游暂时返回空表时连续请求触发限流。
    pub async fn run<T, F, Fut>(&self, description: &str, mut call: F) -> Result<T, MarketDataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, ProviderError>>,
    {
        let mut last_error = ProviderError::EmptyResponse;

        for attempt in 1..=self.max_attempts {
            let error = match call().await {
                Ok(Some(data)) => return Ok(data),
                Ok(None) => ProviderError::EmptyResponse,
                Err(e) => e,
            };

            log::warn!(
                "{} 失败 (尝试 {}/{}): {}",
                description,
                attempt,
                self.max_attempts,
                truncate_message(&error.to_string())
            );

            if attempt < self.max_attempts {
                let delay = self.backoff_delay(&error, attempt);
                log::debug!("{} 等待 {} 毫秒后重试", description, delay.as_millis());
                tokio::time::sleep(delay).await;
            }
            last_error = error;
        }

        Err(MarketDataError::RetryExhausted {
            description: description.to_string(),
            attempts: self.max_attempts,
            source: last_error,
        })
    }
}

fn truncate_message(msg: &str) -> String {
    if msg.chars().count() <= MAX_LOG_MESSAGE_CHARS {
        return msg.to_string();
    }
    let head: String = msg.chars().take(MAX_LOG_MESSAGE_CHARS).collect();
    format!("{}...", head)
}
