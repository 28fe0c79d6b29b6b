//! 基于 HTTP 的行情数据源
//!
//! 把 `ProviderCall` 分发到新浪、东方财富、腾讯的具体接口。
//! 每个上游主机共用一个节流门，并发请求同样遵守请求间隔。

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::services::pacing::{shared_gate, SharedGate};

use super::provider::{MarketDataProvider, ProviderCall, RawTable};
use super::{eastmoney, sina, tencent};

/// HTTP 行情数据源
#[derive(Clone)]
pub struct HttpMarketData {
    /// HTTP 客户端，启动时构建一次
    client: Client,
    sina_gate: SharedGate,
    eastmoney_gate: SharedGate,
    tencent_gate: SharedGate,
}

impl HttpMarketData {
    /// 由已构建的客户端和节流间隔创建数据源
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        let interval = config.pacing_interval();
        Self {
            client,
            sina_gate: shared_gate("sina", interval),
            eastmoney_gate: shared_gate("eastmoney", interval),
            tencent_gate: shared_gate("tencent", interval),
        }
    }

    /// 按配置构建客户端并创建数据源
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.build_client()?, config))
    }

    fn gate_for(&self, call: &ProviderCall) -> &SharedGate {
        match call {
            ProviderCall::DailyHistory { .. } => &self.sina_gate,
            ProviderCall::AltWindowedHistory { .. } => &self.tencent_gate,
            ProviderCall::WindowedHistory { .. }
            | ProviderCall::HotRank
            | ProviderCall::HotKeywords { .. }
            | ProviderCall::SpotSnapshot
            | ProviderCall::Quote { .. } => &self.eastmoney_gate,
        }
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketData {
    async fn call(&self, call: &ProviderCall) -> Result<Option<RawTable>, ProviderError> {
        self.gate_for(call).wait().await;
        log::debug!("请求数据源: {}", call);

        let client = &self.client;
        match call {
            ProviderCall::DailyHistory { symbol } => sina::daily_history(client, symbol).await,
            ProviderCall::WindowedHistory {
                symbol,
                start,
                end,
                adjust,
            } => eastmoney::windowed_history(client, symbol, *start, *end, *adjust).await,
            ProviderCall::AltWindowedHistory { symbol, start, end } => {
                tencent::windowed_history(client, symbol, *start, *end).await
            }
            ProviderCall::HotRank => eastmoney::hot_rank(client).await,
            ProviderCall::HotKeywords { symbol } => eastmoney::hot_keywords(client, symbol).await,
            ProviderCall::SpotSnapshot => eastmoney::spot_snapshot(client).await,
            ProviderCall::Quote { symbol } => {
                // 东方财富带换手率，失败时退回新浪
                match eastmoney::quote(client, symbol).await {
                    Ok(Some(table)) => Ok(Some(table)),
                    Ok(None) => sina::quote(client, symbol).await,
                    Err(e) => {
                        log::debug!("东方财富行情失败，改用新浪: {}", e);
                        self.sina_gate.wait().await;
                        sina::quote(client, symbol).await
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stock::common::Symbol;
    use std::sync::Arc;

    #[test]
    fn test_gate_routing() {
        let provider = HttpMarketData::from_config(&ProviderConfig::default()).unwrap();
        let symbol = Symbol::parse("600000").unwrap();

        let gate = provider.gate_for(&ProviderCall::DailyHistory {
            symbol: symbol.clone(),
        });
        assert!(Arc::ptr_eq(gate, &provider.sina_gate));

        let gate = provider.gate_for(&ProviderCall::HotKeywords { symbol });
        assert!(Arc::ptr_eq(gate, &provider.eastmoney_gate));

        // 克隆后共用同一组节流门
        let cloned = provider.clone();
        assert!(Arc::ptr_eq(&cloned.tencent_gate, &provider.tencent_gate));
    }
}
