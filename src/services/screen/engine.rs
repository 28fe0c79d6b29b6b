//! 热点题材放量筛选
//!
//! 人气榜 → 题材聚合 → 逐只获取 K 线、计算指标、执行规则 → 汇总报告。
//! 单只股票的任何失败都只记录在该候选上，不影响其他候选。

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScreenConfig;
use crate::error::MarketDataError;
use crate::models::{Candidate, HotStock, ScreenParams, ScreenReport, SeriesNote};
use crate::services::indicators;
use crate::services::retry::RetryPolicy;
use crate::services::stock::common::{beijing_today, get_beijing_time};
use crate::services::stock::normalize::normalize_hot_rank;
use crate::services::stock::{HistoryFetcher, MarketDataProvider, ProviderCall, Symbol};

use super::rules::{self, RuleThresholds};
use super::theme::{aggregate_themes, build_candidates, collect_keywords};
use super::turnover::{QuoteResolver, TurnoverSource};

/// 筛选引擎
pub struct ScreenEngine {
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
    history: HistoryFetcher,
    quotes: QuoteResolver,
    config: ScreenConfig,
    thresholds: RuleThresholds,
}

impl ScreenEngine {
    pub fn new(provider: Arc<dyn MarketDataProvider>, retry: RetryPolicy, config: &ScreenConfig) -> Self {
        Self {
            history: HistoryFetcher::new(provider.clone(), retry.clone()),
            quotes: QuoteResolver::new(
                provider.clone(),
                retry.clone(),
                Duration::from_secs(config.snapshot_ttl_secs),
            ),
            thresholds: RuleThresholds::from(config),
            config: config.clone(),
            provider,
            retry,
        }
    }

    pub fn history(&self) -> &HistoryFetcher {
        &self.history
    }

    pub fn quotes(&self) -> &QuoteResolver {
        &self.quotes
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// 个股人气榜前 `top_n` 名
    pub async fn hot_stocks(&self, top_n: usize) -> Result<Vec<HotStock>, MarketDataError> {
        let call = ProviderCall::HotRank;
        let provider = &self.provider;
        let table = self.retry.run(&call.to_string(), || provider.call(&call)).await?;
        normalize_hot_rank(&table, top_n)
    }

    /// 人气榜 → 题材 → 候选股
    pub async fn select_candidates(&self, params: &ScreenParams) -> Result<Vec<Candidate>, MarketDataError> {
        let hot = self.hot_stocks(params.top_hot).await?;
        log::info!("人气榜获取 {} 只股票", hot.len());

        let keywords = collect_keywords(self.provider.as_ref(), &self.retry, &hot).await;
        let themes = aggregate_themes(&keywords);
        for (idx, theme) in themes.iter().take(params.themes).enumerate() {
            log::info!(
                "题材 #{} {}({}) 总热度 {:.0}，成员 {} 只",
                idx + 1,
                theme.name,
                theme.code,
                theme.total_heat,
                theme.members.len()
            );
        }

        Ok(build_candidates(&themes, params))
    }

    /// 评估单个候选，失败原因写入候选本身
    pub async fn evaluate_candidate(&self, mut candidate: Candidate, end: NaiveDate) -> Candidate {
        let symbol = match Symbol::parse(&candidate.stock_code) {
            Ok(s) => s,
            Err(e) => {
                candidate.fail(format!("数据获取失败: {}", e));
                return candidate;
            }
        };

        let history = match self
            .history
            .fetch_until(
                &symbol,
                self.config.lookback_months,
                self.config.allow_extended,
                end,
            )
            .await
        {
            Ok(h) => h,
            Err(e) => {
                log::warn!("{} 获取日线失败: {}", symbol, e);
                candidate.fail(format!("数据获取失败: {}", e));
                return candidate;
            }
        };

        candidate.history_method = Some(history.method.clone());
        candidate
            .notes
            .extend(history.series.notes.iter().map(describe_note));

        let indicator_set = indicators::compute(&history.series);
        let turnover = self.quotes.turnover_rate(&symbol, &history.series).await;
        if let Some((_, source)) = turnover {
            if source != TurnoverSource::Snapshot {
                candidate
                    .notes
                    .push(format!("换手率来源: {}", source.label()));
            }
        }

        rules::evaluate(
            &mut candidate,
            &history.series,
            &indicator_set,
            turnover.map(|(rate, _)| rate),
            &self.thresholds,
        );

        if candidate.stock_name.is_empty() {
            if let Some(name) = self.quotes.display_name(&symbol).await {
                candidate.stock_name = name;
            }
        }

        log::info!(
            "{} {} {}",
            candidate.stock_code,
            candidate.stock_name,
            if candidate.passed {
                "通过".to_string()
            } else {
                format!("未通过: {}", candidate.fail_reasons.join(", "))
            }
        );
        candidate
    }

    /// 执行一次完整筛选
    ///
    /// 只有人气榜获取失败才返回错误；候选的失败体现在报告中
    pub async fn run(&self, params: ScreenParams) -> Result<ScreenReport, MarketDataError> {
        let end = beijing_today();
        let candidates = self.select_candidates(&params).await?;
        log::info!(
            "共 {} 个候选股，并发数 {}",
            candidates.len(),
            self.config.concurrency.max(1)
        );

        let mut results: Vec<Candidate> = stream::iter(candidates)
            .map(|c| self.evaluate_candidate(c, end))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        sort_results(&mut results);
        let passed_count = results.iter().filter(|c| c.passed).count();
        log::info!("筛选完成: {}/{} 通过", passed_count, results.len());

        Ok(ScreenReport {
            run_at: get_beijing_time(),
            params,
            results,
            passed_count,
        })
    }
}

fn describe_note(note: &SeriesNote) -> String {
    match note {
        SeriesNote::VolumeEstimated => "成交量缺失，按 成交额 ÷ 收盘价 估算".to_string(),
        SeriesNote::DroppedRows { count } => format!("丢弃 {} 行无效数据", count),
        SeriesNote::DuplicateDates { count } => format!("合并 {} 个重复日期", count),
    }
}

/// 通过的在前，其次按题材排名、题材内排名
pub fn sort_results(results: &mut [Candidate]) {
    results.sort_by_key(|c| (!c.passed, c.theme_rank, c.theme_member_rank));
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    value
        .map(|v| format!("{:.2}{}", v, suffix))
        .unwrap_or_else(|| "-".to_string())
}

/// 控制台表格
pub fn render_table(report: &ScreenReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "热点题材放量筛选 {}  (人气榜前 {} / 题材 {} / 每题材 {} 只)\n",
        report.run_at, report.params.top_hot, report.params.themes, report.params.theme_members
    ));
    out.push_str(&format!(
        "{:<4} {:<12} {:<4} {:<8} {:<10} {:>8} {:>8} {:>8} {:>6} {:<6} {}\n",
        "题材", "题材名称", "排名", "代码", "名称", "收盘", "涨跌幅", "换手率", "量比", "结果", "原因"
    ));

    for c in &report.results {
        out.push_str(&format!(
            "{:<4} {:<12} {:<4} {:<8} {:<10} {:>8} {:>8} {:>8} {:>6} {:<6} {}\n",
            c.theme_rank,
            c.theme_name,
            c.theme_member_rank,
            c.stock_code,
            c.stock_name,
            fmt_opt(c.close, ""),
            fmt_opt(c.pct_change, "%"),
            fmt_opt(c.turnover_pct, "%"),
            fmt_opt(c.volume_ratio, ""),
            if c.passed { "通过" } else { "未通过" },
            c.fail_reasons.join(", ")
        ));
    }

    out.push_str(&format!(
        "共 {} 只候选，{} 只通过\n",
        report.results.len(),
        report.passed_count
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::services::stock::mock::{bars_table, Bar, ScriptedProvider};
    use crate::services::stock::RawTable;
    use serde_json::json;

    fn strong_bars() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..12)
            .map(|i| (10.0, 10.0, 10.0, 10.0, if i < 10 { 100.0 } else { 150.0 }))
            .collect();
        bars.push((10.00, 10.08, 9.98, 10.06, 150.0));
        bars
    }

    fn keyword_table(concept: &str, heat: f64) -> RawTable {
        RawTable::from_columns(
            &["时间", "概念名称", "概念代码", "热度"],
            vec![vec![
                json!("2024-06-28 10:00:00"),
                json!(format!("题材{}", concept)),
                json!(concept),
                json!(heat),
            ]],
        )
    }

    fn provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new(|call| match call {
            ProviderCall::HotRank => Ok(Some(RawTable::from_columns(
                &["当前排名", "代码", "股票名称"],
                vec![
                    vec![json!(2), json!("SZ000002"), json!("万科A")],
                    vec![json!(1), json!("SZ000001"), json!("平安银行")],
                    vec![json!(3), json!("SH600000"), json!("")],
                ],
            ))),
            ProviderCall::HotKeywords { symbol } => match symbol.code.as_str() {
                "000001" => Ok(Some(keyword_table("A", 90.0))),
                "000002" => Ok(Some(keyword_table("A", 80.0))),
                _ => Ok(Some(keyword_table("B", 10.0))),
            },
            ProviderCall::DailyHistory { symbol } if symbol.code != "000002" => {
                Ok(Some(bars_table(beijing_today(), &strong_bars(), None)))
            }
            ProviderCall::SpotSnapshot => Ok(Some(RawTable::from_columns(
                &["代码", "名称", "换手率"],
                vec![
                    vec![json!("000001"), json!("平安银行"), json!(6.0)],
                    vec![json!("600000"), json!("浦发银行"), json!(2.0)],
                ],
            ))),
            _ => Err(ProviderError::Connection("reset".into())),
        }))
    }

    fn engine(provider: Arc<ScriptedProvider>, concurrency: usize) -> ScreenEngine {
        let config = ScreenConfig {
            concurrency,
            ..ScreenConfig::default()
        };
        ScreenEngine::new(
            provider,
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
            },
            &config,
        )
    }

    fn params() -> ScreenParams {
        ScreenParams {
            top_hot: 10,
            themes: 2,
            theme_members: 3,
        }
    }

    #[tokio::test]
    async fn test_run_reports_every_candidate() {
        let report = engine(provider(), 2).run(params()).await.unwrap();
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.passed_count, 1);

        let first = &report.results[0];
        assert_eq!(first.stock_code, "000001");
        assert!(first.passed);
        assert_eq!(first.turnover_pct, Some(6.0));
        assert_eq!(first.history_method.as_deref(), Some("sina_daily"));

        // 所有数据源失败的候选仍出现在结果中
        let failed = report
            .results
            .iter()
            .find(|c| c.stock_code == "000002")
            .unwrap();
        assert!(!failed.passed);
        assert!(failed.fail_reasons[0].starts_with("数据获取失败"));
        assert!(failed.rules.is_none());

        // 换手率不足且名称由快照补齐
        let low = report
            .results
            .iter()
            .find(|c| c.stock_code == "600000")
            .unwrap();
        assert_eq!(low.stock_name, "浦发银行");
        assert_eq!(low.fail_reasons, vec!["turnover_ge_5pct".to_string()]);
        assert_eq!(low.theme_rank, 2);
    }

    #[tokio::test]
    async fn test_hot_rank_failure_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(|_| Err(ProviderError::Timeout("15s".into()))));
        let err = engine(provider, 1).run(params()).await.unwrap_err();
        assert!(matches!(err, MarketDataError::RetryExhausted { .. }));
    }

    #[test]
    fn test_sort_and_render() {
        let mut report = ScreenReport {
            run_at: "2024-06-28T15:00:00+08:00".to_string(),
            params: params(),
            results: Vec::new(),
            passed_count: 0,
        };
        let base = Candidate {
            stock_code: "000001".to_string(),
            stock_name: "平安银行".to_string(),
            stock_hot_rank: 1,
            stock_hot_heat: 0.0,
            theme_rank: 1,
            theme_code: "A".to_string(),
            theme_name: "银行".to_string(),
            theme_total_heat: 1.0,
            theme_member_rank: 1,
            member_concept_heat: 1.0,
            trade_date: None,
            close: Some(10.06),
            pct_change: None,
            turnover_pct: None,
            volume_ratio: None,
            history_method: None,
            indicators: None,
            rules: None,
            passed: false,
            fail_reasons: vec!["volume_expansion".to_string()],
            notes: Vec::new(),
        };
        let mut passed = base.clone();
        passed.stock_code = "000009".to_string();
        passed.theme_rank = 2;
        passed.passed = true;
        passed.fail_reasons.clear();
        report.results = vec![base, passed];
        report.passed_count = 1;

        sort_results(&mut report.results);
        assert_eq!(report.results[0].stock_code, "000009");

        let table = render_table(&report);
        assert!(table.contains("000009"));
        assert!(table.contains("volume_expansion"));
        assert!(table.contains("10.06"));
        assert!(table.contains("共 2 只候选，1 只通过"));
    }
}
