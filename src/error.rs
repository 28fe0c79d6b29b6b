//! 错误类型定义
//!
//! - ProviderError: 单次上游调用的失败，区分连接类与其他类
//! - MarketDataError: 行情数据获取流程中的领域错误

use thiserror::Error;

/// 上游数据源单次调用错误
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// 连接失败、连接被重置、传输中断
    #[error("连接错误: {0}")]
    Connection(String),
    /// 请求超时
    #[error("请求超时: {0}")]
    Timeout(String),
    /// 非 2xx 状态码
    #[error("HTTP 状态异常: {status}")]
    Http { status: u16 },
    /// 响应无法解析
    #[error("解析失败: {0}")]
    Parse(String),
    /// 数据源返回空结果（等价于 None）
    #[error("数据源返回空结果")]
    EmptyResponse,
}

impl ProviderError {
    /// 是否为连接类错误（重试时使用指数退避）
    pub fn is_connection_class(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            Self::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// 行情数据领域错误
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// 股票代码非法
    #[error("无效股票代码: {0}")]
    InvalidSymbol(String),
    /// 没有任何同义列能解析出必需字段
    #[error("无法识别必需列: {field}")]
    Schema { field: &'static str },
    /// 重试耗尽
    #[error("无法获取 {description}（已尝试 {attempts} 次）: {source}")]
    RetryExhausted {
        description: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },
    /// 所有策略均失败
    #[error("股票 {symbol} 无可用数据")]
    NoData { symbol: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_classification() {
        assert!(ProviderError::Connection("reset".into()).is_connection_class());
        assert!(ProviderError::Timeout("30s".into()).is_connection_class());
        assert!(!ProviderError::Http { status: 502 }.is_connection_class());
        assert!(!ProviderError::Parse("bad json".into()).is_connection_class());
        assert!(!ProviderError::EmptyResponse.is_connection_class());
    }

    #[test]
    fn test_retry_exhausted_message_carries_description() {
        let err = MarketDataError::RetryExhausted {
            description: "sh600000 日线".to_string(),
            attempts: 3,
            source: ProviderError::Timeout("deadline".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("sh600000 日线"));
        assert!(msg.contains("3"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
