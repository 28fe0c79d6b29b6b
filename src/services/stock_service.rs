//! 股票数据服务
//!
//! HTTP 处理器和命令行共用的入口，组合数据源、历史 K 线、指标和筛选引擎

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::MarketDataError;
use crate::models::{
    HistoryQuery, HistoryResult, HotRankQuery, HotStock, IndicatorQuery, IndicatorSet, ScreenParams,
    ScreenQuery, ScreenReport, StockQuote,
};
use crate::services::indicators;
use crate::services::retry::RetryPolicy;
use crate::services::screen::ScreenEngine;
use crate::services::stock::common::{get_beijing_time, MAX_LOOKBACK_MONTHS};
use crate::services::stock::{MarketDataProvider, Symbol};

/// 人气榜单次最多返回数量
const MAX_HOT_LIMIT: usize = 100;

pub struct StockService {
    engine: ScreenEngine,
}

impl StockService {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &AppConfig) -> Self {
        let retry = RetryPolicy::from(&config.provider.retry);
        Self {
            engine: ScreenEngine::new(provider, retry, &config.screen),
        }
    }

    /// 获取实时行情
    pub async fn get_quote(&self, symbol: &str) -> Result<StockQuote, MarketDataError> {
        let symbol = Symbol::parse(symbol)?;
        let quotes = self.engine.quotes();
        let row = quotes.fetch_quote(&symbol).await?;

        let name = match row.name {
            Some(name) => Some(name),
            None => quotes.display_name(&symbol).await,
        };
        let turnover_rate = match row.turnover_rate {
            Some(rate) => Some(rate),
            None => quotes
                .snapshot_row(&symbol)
                .await
                .and_then(|r| r.turnover_rate),
        };

        Ok(StockQuote {
            symbol: symbol.prefixed(),
            name,
            price: row.price,
            change_percent: row.change_percent,
            turnover_rate,
            updated_at: get_beijing_time(),
        })
    }

    /// 获取个股人气榜
    pub async fn get_hot_rank(&self, query: &HotRankQuery) -> Result<Vec<HotStock>, MarketDataError> {
        let limit = query
            .limit
            .unwrap_or(self.engine.config().top_hot)
            .clamp(1, MAX_HOT_LIMIT);
        self.engine.hot_stocks(limit).await
    }

    /// 获取日 K 线
    pub async fn get_history(&self, symbol: &str, query: &HistoryQuery) -> Result<HistoryResult, MarketDataError> {
        let symbol = Symbol::parse(symbol)?;
        let config = self.engine.config();
        let months = query
            .months
            .unwrap_or(config.lookback_months)
            .clamp(1, MAX_LOOKBACK_MONTHS);
        let extended = query.extended.unwrap_or(config.allow_extended);
        self.engine.history().fetch(&symbol, months, extended).await
    }

    /// 获取技术指标
    pub async fn get_indicators(&self, symbol: &str, query: &IndicatorQuery) -> Result<IndicatorSet, MarketDataError> {
        let history = self
            .get_history(
                symbol,
                &HistoryQuery {
                    months: query.months,
                    extended: None,
                },
            )
            .await?;
        Ok(indicators::compute(&history.series))
    }

    /// 查询参数与配置合并
    pub fn screen_params(&self, query: &ScreenQuery) -> ScreenParams {
        let config = self.engine.config();
        ScreenParams {
            top_hot: query.top_hot.unwrap_or(config.top_hot).clamp(1, MAX_HOT_LIMIT),
            themes: query.themes.unwrap_or(config.themes).max(1),
            theme_members: query.theme_members.unwrap_or(config.theme_members).max(1),
        }
    }

    /// 执行热点题材放量筛选
    pub async fn run_screen(&self, params: ScreenParams) -> Result<ScreenReport, MarketDataError> {
        self.engine.run(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::services::stock::mock::{bars_table, flat_bars, ScriptedProvider};
    use crate::services::stock::common::beijing_today;
    use crate::services::stock::{ProviderCall, RawTable};
    use serde_json::json;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.retry.max_attempts = 1;
        config.provider.retry.base_delay_ms = 0;
        config
    }

    fn service() -> StockService {
        let provider = ScriptedProvider::new(|call| match call {
            ProviderCall::Quote { .. } => Ok(Some(RawTable::from_columns(
                &["代码", "最新价", "涨跌幅"],
                vec![vec![json!("600000"), json!(8.5), json!(1.2)]],
            ))),
            ProviderCall::SpotSnapshot => Ok(Some(RawTable::from_columns(
                &["代码", "名称", "换手率"],
                vec![vec![json!("600000"), json!("浦发银行"), json!(0.8)]],
            ))),
            ProviderCall::DailyHistory { .. } => Ok(Some(bars_table(
                beijing_today(),
                &flat_bars(&(1..=40).map(|i| i as f64).collect::<Vec<_>>(), 100.0),
                None,
            ))),
            _ => Err(ProviderError::Http { status: 404 }),
        });
        StockService::new(Arc::new(provider), &config())
    }

    #[tokio::test]
    async fn test_quote_fills_name_and_turnover_from_snapshot() {
        let quote = service().get_quote("600000").await.unwrap();
        assert_eq!(quote.symbol, "sh600000");
        assert_eq!(quote.name.as_deref(), Some("浦发银行"));
        assert_eq!(quote.price, Some(8.5));
        assert_eq!(quote.turnover_rate, Some(0.8));
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let err = service().get_quote("abc").await.unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn test_huge_lookback_returns_error() {
        let provider = ScriptedProvider::new(|_| Ok(None));
        let service = StockService::new(Arc::new(provider), &config());
        let err = service
            .get_history(
                "600000",
                &HistoryQuery {
                    months: Some(4_000_000),
                    extended: Some(false),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NoData { .. }));
    }

    #[tokio::test]
    async fn test_indicators_from_history() {
        let set = service()
            .get_indicators("600000", &IndicatorQuery { months: Some(3) })
            .await
            .unwrap();
        assert_eq!(set.periods, 40);
        assert!(set.macd.macd.is_some());
        assert_eq!(set.moving_averages.ma5, Some(38.0));
    }

    #[test]
    fn test_screen_params_defaults_and_overrides() {
        let service = service();
        let params = service.screen_params(&ScreenQuery {
            top_hot: None,
            themes: Some(5),
            theme_members: Some(0),
        });
        assert_eq!(params.top_hot, 60);
        assert_eq!(params.themes, 5);
        assert_eq!(params.theme_members, 1);
    }
}
