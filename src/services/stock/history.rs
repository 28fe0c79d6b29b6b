//! 多数据源历史 K 线获取
//!
//! 按固定优先级依次尝试：
//! 1. 新浪全量日线，再按请求窗口过滤
//! 2. 东方财富区间日线，回看月数 × 复权方式（前复权、后复权、不复权）
//! 3. 腾讯区间日线，按同样的回看月数
//!
//! 每个策略都经过重试和列名归一化，过滤到请求窗口后仍有数据才算成功。

use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::MarketDataError;
use crate::models::{AdjustMode, AttemptOutcome, HistoryResult, OhlcvSeries, SeriesNote, StrategyAttempt};
use crate::services::retry::RetryPolicy;

use super::common::{beijing_today, months_before, Symbol};
use super::normalize::normalize_ohlcv;
use super::provider::{MarketDataProvider, ProviderCall};

/// 扩大窗口时使用的回看月数
const EXTENDED_LOOKBACK_MONTHS: u32 = 6;

/// 一个获取策略：名称 + 查询
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub method: String,
    pub call: ProviderCall,
}

/// 实际使用的回看月数列表
fn lookbacks(months: u32, allow_extended: bool) -> Vec<u32> {
    let mut result = vec![months];
    if allow_extended && months < EXTENDED_LOOKBACK_MONTHS {
        result.push(EXTENDED_LOOKBACK_MONTHS);
    }
    result
}

/// 生成按优先级排列的策略列表
pub fn plan_strategies(symbol: &Symbol, months: u32, allow_extended: bool, end: NaiveDate) -> Vec<Strategy> {
    let lookbacks = lookbacks(months, allow_extended);
    let mut strategies = vec![Strategy {
        method: "sina_daily".to_string(),
        call: ProviderCall::DailyHistory {
            symbol: symbol.clone(),
        },
    }];

    for &lookback in &lookbacks {
        for adjust in [AdjustMode::Forward, AdjustMode::Backward, AdjustMode::None] {
            strategies.push(Strategy {
                method: format!("eastmoney_{}_{}m", adjust.label(), lookback),
                call: ProviderCall::WindowedHistory {
                    symbol: symbol.clone(),
                    start: months_before(end, lookback),
                    end,
                    adjust,
                },
            });
        }
    }

    for &lookback in &lookbacks {
        strategies.push(Strategy {
            method: format!("tencent_qfq_{}m", lookback),
            call: ProviderCall::AltWindowedHistory {
                symbol: symbol.clone(),
                start: months_before(end, lookback),
                end,
            },
        });
    }

    strategies
}

/// 历史 K 线获取器
#[derive(Clone)]
pub struct HistoryFetcher {
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
}

impl HistoryFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// 获取截至北京时间今天、回看 `months` 个月的日 K 线
    pub async fn fetch(
        &self,
        symbol: &Symbol,
        months: u32,
        allow_extended: bool,
    ) -> Result<HistoryResult, MarketDataError> {
        self.fetch_until(symbol, months, allow_extended, beijing_today())
            .await
    }

    /// 获取 [end - months, end] 窗口内的日 K 线
    pub async fn fetch_until(
        &self,
        symbol: &Symbol,
        months: u32,
        allow_extended: bool,
        end: NaiveDate,
    ) -> Result<HistoryResult, MarketDataError> {
        let start = months_before(end, months);
        let mut attempts = Vec::new();

        for strategy in plan_strategies(symbol, months, allow_extended, end) {
            match self.run_strategy(&strategy, symbol, start, end).await {
                Ok(series) => {
                    log::info!(
                        "{} 使用 {} 获取到 {} 条日线 ({} ~ {})",
                        symbol,
                        strategy.method,
                        series.len(),
                        start,
                        end
                    );
                    attempts.push(StrategyAttempt {
                        method: strategy.method.clone(),
                        outcome: AttemptOutcome::Success { rows: series.len() },
                    });
                    return Ok(HistoryResult {
                        series,
                        method: strategy.method,
                        start_date: start,
                        end_date: end,
                        attempts,
                    });
                }
                Err(outcome) => attempts.push(StrategyAttempt {
                    method: strategy.method,
                    outcome,
                }),
            }
        }

        log::error!("{} 所有数据源均未获取到日线 (共尝试 {} 个策略)", symbol, attempts.len());
        Err(MarketDataError::NoData {
            symbol: symbol.to_string(),
        })
    }

    async fn run_strategy(
        &self,
        strategy: &Strategy,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<OhlcvSeries, AttemptOutcome> {
        let description = strategy.call.to_string();
        let provider = &self.provider;
        let call = &strategy.call;

        let table = match self.retry.run(&description, move || provider.call(call)).await {
            Ok(table) => table,
            Err(e) => {
                log::warn!("[{}] 请求失败，尝试下一个数据源: {}", strategy.method, e);
                return Err(AttemptOutcome::Failed {
                    message: e.to_string(),
                });
            }
        };

        if table.is_empty() {
            log::warn!("[{}] 返回空表，尝试下一个数据源", strategy.method);
            return Err(AttemptOutcome::EmptyResult);
        }

        let series = match normalize_ohlcv(&table, &symbol.prefixed()) {
            Ok(series) => series,
            Err(e) => {
                log::warn!(
                    "[{}] 列名无法识别 ({})，返回列 {:?}，尝试下一个数据源",
                    strategy.method,
                    e,
                    table.columns()
                );
                return Err(AttemptOutcome::SchemaMismatch {
                    message: e.to_string(),
                });
            }
        };

        let raw_rows = series.len();
        let filtered = series.filter_window(start, end);
        if filtered.is_empty() {
            log::warn!(
                "[{}] 返回 {} 条数据，但 {} ~ {} 窗口内为空，尝试下一个数据源",
                strategy.method,
                raw_rows,
                start,
                end
            );
            return Err(AttemptOutcome::EmptyAfterFilter { raw_rows });
        }

        if filtered.notes.contains(&SeriesNote::VolumeEstimated) {
            log::warn!("[{}] 缺少成交量列，已按 成交额 ÷ 收盘价 估算", strategy.method);
        }

        Ok(filtered)
    }
}
