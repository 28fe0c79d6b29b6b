//! 筛选规则
//!
//! 四条规则必须全部满足：
//! - volume_expansion: 近 3 日均量 >= 前 10 日均量 × 放量倍数
//! - above_short_ma: 最新收盘价高于 MA5 和 MA10
//! - turnover_ge_5pct: 换手率 >= 阈值，取不到换手率视为不满足
//! - kline_strong_bull: 实体阳线且没有冲高回落

use crate::config::ScreenConfig;
use crate::models::{Candidate, IndicatorSet, OhlcvRecord, OhlcvSeries, RuleOutcomes};

/// 放量判断所需的最少 K 线数
pub const MIN_VOLUME_PERIODS: usize = 13;
/// 近期窗口
const RECENT_PERIODS: usize = 3;
/// 最小实体涨幅（相对开盘价）
const MIN_BODY_RATIO: f64 = 0.005;
/// 浮点比较容差，边界值按满足处理
const EPS: f64 = 1e-9;

/// 规则阈值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    /// 最低换手率（百分比）
    pub min_turnover_pct: f64,
    /// 放量倍数
    pub volume_ratio: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self::from(&ScreenConfig::default())
    }
}

impl From<&ScreenConfig> for RuleThresholds {
    fn from(config: &ScreenConfig) -> Self {
        Self {
            min_turnover_pct: config.min_turnover_pct,
            volume_ratio: config.volume_ratio,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// (近 3 日均量, 前 10 日均量)，数据不足 13 日时返回 None
fn volume_means(volumes: &[f64]) -> Option<(f64, f64)> {
    let n = volumes.len();
    if n < MIN_VOLUME_PERIODS {
        return None;
    }
    let recent = mean(&volumes[n - RECENT_PERIODS..]);
    let base = mean(&volumes[n - MIN_VOLUME_PERIODS..n - RECENT_PERIODS]);
    Some((recent, base))
}

/// 放量倍数
pub fn volume_ratio(volumes: &[f64]) -> Option<f64> {
    volume_means(volumes)
        .filter(|(_, base)| *base > 0.0)
        .map(|(recent, base)| recent / base)
}

/// 近 3 日均量是否达到前 10 日均量的 `ratio` 倍
pub fn volume_expansion(volumes: &[f64], ratio: f64) -> bool {
    match volume_means(volumes) {
        Some((recent, base)) if base > 0.0 => recent + EPS >= ratio * base,
        _ => false,
    }
}

/// 收盘价同时站上 MA5 和 MA10
pub fn above_short_ma(close: f64, ma5: Option<f64>, ma10: Option<f64>) -> bool {
    match (ma5, ma10) {
        (Some(ma5), Some(ma10)) => close > ma5 && close > ma10,
        _ => false,
    }
}

/// 实体阳线
///
/// 收盘 > 开盘，实体 >= 振幅的一半，实体 / 开盘 >= 0.5%，上影线不长于实体
pub fn strong_bull_candle(bar: &OhlcvRecord) -> bool {
    let body = bar.close - bar.open;
    if body <= 0.0 || bar.open <= 0.0 {
        return false;
    }
    let range = bar.high - bar.low;
    let upper_shadow = bar.high - bar.close.max(bar.open);

    body + EPS >= 0.5 * range && body / bar.open + EPS >= MIN_BODY_RATIO && upper_shadow <= body + EPS
}

/// 对一个候选股执行全部规则，结果写回候选股
///
/// 数据不足只会让该候选失败，不会返回错误
pub fn evaluate(
    candidate: &mut Candidate,
    series: &OhlcvSeries,
    indicators: &IndicatorSet,
    turnover_pct: Option<f64>,
    thresholds: &RuleThresholds,
) {
    let last = match series.last() {
        Some(bar) => bar.clone(),
        None => {
            candidate.fail("无有效K线数据");
            return;
        }
    };

    candidate.trade_date = Some(last.trade_date);
    candidate.close = Some(last.close);
    candidate.pct_change = series
        .previous()
        .filter(|prev| prev.close > 0.0)
        .map(|prev| (last.close - prev.close) / prev.close * 100.0);
    candidate.turnover_pct = turnover_pct;
    candidate.indicators = Some(indicators.clone());

    if series.len() < MIN_VOLUME_PERIODS {
        candidate.fail(format!("历史数据不足 {} 天", MIN_VOLUME_PERIODS));
        return;
    }

    let volumes = series.volumes();
    candidate.volume_ratio = volume_ratio(&volumes);

    let ma = &indicators.moving_averages;
    let rules = RuleOutcomes {
        volume_expansion: volume_expansion(&volumes, thresholds.volume_ratio),
        above_short_ma: above_short_ma(last.close, ma.ma5, ma.ma10),
        turnover_ge_5pct: turnover_pct
            .map(|t| t + EPS >= thresholds.min_turnover_pct)
            .unwrap_or(false),
        kline_strong_bull: strong_bull_candle(&last),
    };

    if turnover_pct.is_none() {
        candidate.notes.push("换手率无法获取".to_string());
    }

    candidate.rules = Some(rules);
    for name in rules.failed() {
        candidate.fail(name);
    }
    candidate.passed = rules.all_passed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators;
    use chrono::{Duration, NaiveDate};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcvRecord {
        OhlcvRecord {
            trade_date: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            turnover: 1000.0 * close,
            turnover_rate: None,
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            stock_code: "000001".to_string(),
            stock_name: "平安银行".to_string(),
            stock_hot_rank: 1,
            stock_hot_heat: 0.0,
            theme_rank: 1,
            theme_code: "BK0475".to_string(),
            theme_name: "银行".to_string(),
            theme_total_heat: 100.0,
            theme_member_rank: 1,
            member_concept_heat: 100.0,
            trade_date: None,
            close: None,
            pct_change: None,
            turnover_pct: None,
            volume_ratio: None,
            history_method: None,
            indicators: None,
            rules: None,
            passed: false,
            fail_reasons: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// 前 12 日平盘，最后一日为指定 K 线；成交量 10 日 100、3 日 150
    fn series_with_last(last: OhlcvRecord) -> OhlcvSeries {
        let mut records: Vec<OhlcvRecord> = (0..12)
            .map(|i| {
                let mut r = bar(10.0, 10.0, 10.0, 10.0);
                r.trade_date = last.trade_date - Duration::days(12 - i);
                r.volume = if i < 10 { 100.0 } else { 150.0 };
                r
            })
            .collect();
        let mut last = last;
        last.volume = 150.0;
        records.push(last);
        OhlcvSeries {
            symbol: "sz000001".to_string(),
            records,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_volume_expansion_boundary_inclusive() {
        let mut volumes = vec![100.0; 10];
        volumes.extend([150.0, 150.0, 150.0]);
        assert!(volume_expansion(&volumes, 1.5));
        assert_eq!(volume_ratio(&volumes), Some(1.5));

        volumes[12] = 149.0;
        assert!(!volume_expansion(&volumes, 1.5));

        // 不足 13 日
        assert!(!volume_expansion(&volumes[1..], 1.5));
        assert_eq!(volume_ratio(&volumes[1..]), None);
    }

    #[test]
    fn test_strong_bull_candle() {
        assert!(strong_bull_candle(&bar(10.00, 10.08, 9.98, 10.06)));
        // 冲高回落
        assert!(!strong_bull_candle(&bar(10.00, 10.20, 9.95, 10.02)));
        // 阴线
        assert!(!strong_bull_candle(&bar(10.06, 10.08, 9.98, 10.00)));
        // 实体太小
        assert!(!strong_bull_candle(&bar(10.00, 10.03, 9.99, 10.03)));
    }

    #[test]
    fn test_above_short_ma() {
        assert!(above_short_ma(10.5, Some(10.2), Some(10.1)));
        assert!(!above_short_ma(10.5, Some(10.6), Some(10.1)));
        assert!(!above_short_ma(10.5, None, Some(10.1)));
    }

    #[test]
    fn test_evaluate_all_pass() {
        let series = series_with_last(bar(10.00, 10.08, 9.98, 10.06));
        let indicators = indicators::compute(&series);
        let mut c = candidate();
        evaluate(&mut c, &series, &indicators, Some(6.0), &RuleThresholds::default());

        assert!(c.passed, "{:?}", c.fail_reasons);
        assert!(c.fail_reasons.is_empty());
        assert_eq!(c.close, Some(10.06));
        assert!((c.pct_change.unwrap() - 0.6).abs() < 1e-9);
        assert!((c.volume_ratio.unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_turnover_forces_failure() {
        let series = series_with_last(bar(10.00, 10.08, 9.98, 10.06));
        let indicators = indicators::compute(&series);
        let mut c = candidate();
        evaluate(&mut c, &series, &indicators, None, &RuleThresholds::default());

        assert!(!c.passed);
        assert_eq!(c.fail_reasons, vec!["turnover_ge_5pct".to_string()]);
        assert_eq!(c.rules.map(|r| r.turnover_ge_5pct), Some(false));
    }

    #[test]
    fn test_spike_and_fade_fails_candle_rule() {
        let series = series_with_last(bar(10.00, 10.20, 9.95, 10.02));
        let indicators = indicators::compute(&series);
        let mut c = candidate();
        evaluate(&mut c, &series, &indicators, Some(8.0), &RuleThresholds::default());
        assert!(!c.passed);
        assert!(c.fail_reasons.contains(&"kline_strong_bull".to_string()));
    }

    #[test]
    fn test_short_history_is_hard_fail() {
        let mut series = series_with_last(bar(10.00, 10.08, 9.98, 10.06));
        series.records.drain(0..5);
        let indicators = indicators::compute(&series);
        let mut c = candidate();
        evaluate(&mut c, &series, &indicators, Some(8.0), &RuleThresholds::default());
        assert!(!c.passed);
        assert!(c.rules.is_none());
        assert_eq!(c.fail_reasons, vec!["历史数据不足 13 天".to_string()]);
        // 基础字段仍然填充
        assert_eq!(c.close, Some(10.06));
    }
}
