//! 换手率与股票名称查询
//!
//! 换手率依次取自：全市场快照（缓存）、单只实时行情、K 线最后一日。
//! 各数据源的单位在列名映射表里声明，这里拿到的都已是百分比。

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::error::MarketDataError;
use crate::models::OhlcvSeries;
use crate::services::cache::TimedCache;
use crate::services::retry::RetryPolicy;
use crate::services::stock::normalize::{normalize_quotes, QuoteRow};
use crate::services::stock::{MarketDataProvider, ProviderCall, Symbol};

/// 换手率来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnoverSource {
    Snapshot,
    Quote,
    History,
}

impl TurnoverSource {
    pub fn label(&self) -> &'static str {
        match self {
            TurnoverSource::Snapshot => "snapshot",
            TurnoverSource::Quote => "quote",
            TurnoverSource::History => "history",
        }
    }
}

/// 行情查询，全市场快照按时间缓存
pub struct QuoteResolver {
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
    snapshot: TimedCache<HashMap<String, QuoteRow>>,
}

impl QuoteResolver {
    pub fn new(provider: Arc<dyn MarketDataProvider>, retry: RetryPolicy, snapshot_ttl: Duration) -> Self {
        Self {
            provider,
            retry,
            snapshot: TimedCache::new(snapshot_ttl),
        }
    }

    /// 全市场快照，六位代码 → 行情
    ///
    /// 拉取失败时缓存空表，有效期内不再重复请求，调用方转用单只行情
    async fn snapshot(&self) -> Arc<HashMap<String, QuoteRow>> {
        let provider = &self.provider;
        let retry = &self.retry;
        let loaded = self
            .snapshot
            .get_or_try_load(|| async move {
                let call = ProviderCall::SpotSnapshot;
                let rows = match retry.run(&call.to_string(), || provider.call(&call)).await {
                    Ok(table) => normalize_quotes(&table),
                    Err(e) => {
                        log::warn!("获取全市场快照失败: {}", e);
                        Vec::new()
                    }
                };
                log::debug!("全市场快照共 {} 只股票", rows.len());
                Ok::<_, Infallible>(rows.into_iter().map(|row| (row.code.clone(), row)).collect())
            })
            .await;

        match loaded {
            Ok(map) => map,
            Err(never) => match never {},
        }
    }

    /// 单只实时行情
    pub async fn fetch_quote(&self, symbol: &Symbol) -> Result<QuoteRow, MarketDataError> {
        let call = ProviderCall::Quote {
            symbol: symbol.clone(),
        };
        let provider = &self.provider;
        let table = self.retry.run(&call.to_string(), || provider.call(&call)).await?;
        normalize_quotes(&table)
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::NoData {
                symbol: symbol.to_string(),
            })
    }

    /// 快照中的行情
    pub async fn snapshot_row(&self, symbol: &Symbol) -> Option<QuoteRow> {
        self.snapshot().await.get(&symbol.code).cloned()
    }

    async fn quote(&self, symbol: &Symbol) -> Option<QuoteRow> {
        match self.fetch_quote(symbol).await {
            Ok(row) => Some(row),
            Err(e) => {
                log::warn!("获取 {} 实时行情失败: {}", symbol, e);
                None
            }
        }
    }

    /// 换手率（百分比），所有来源都取不到时返回 None
    pub async fn turnover_rate(
        &self,
        symbol: &Symbol,
        series: &OhlcvSeries,
    ) -> Option<(f64, TurnoverSource)> {
        if let Some(rate) = self.snapshot_row(symbol).await.and_then(|row| row.turnover_rate) {
            return Some((rate, TurnoverSource::Snapshot));
        }

        if let Some(rate) = self.quote(symbol).await.and_then(|row| row.turnover_rate) {
            return Some((rate, TurnoverSource::Quote));
        }

        if let Some(rate) = series.last().and_then(|r| r.turnover_rate) {
            return Some((rate, TurnoverSource::History));
        }

        log::warn!("{} 无法从任何数据源获取换手率", symbol);
        None
    }

    /// 股票名称，取不到时明确返回 None
    pub async fn display_name(&self, symbol: &Symbol) -> Option<String> {
        if let Some(name) = self.snapshot_row(symbol).await.and_then(|row| row.name) {
            return Some(name);
        }

        let name = self.quote(symbol).await.and_then(|row| row.name);
        if name.is_none() {
            log::info!("{} 未找到股票名称", symbol);
        }
        name
    }
}
