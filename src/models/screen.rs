//! 热点题材筛选模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::indicator::IndicatorSet;

/// 各条规则的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcomes {
    /// 近 3 日均量 >= 前 10 日均量 × 1.5
    pub volume_expansion: bool,
    /// 收盘价站上 MA5 与 MA10
    pub above_short_ma: bool,
    /// 换手率 >= 5%
    pub turnover_ge_5pct: bool,
    /// 实体阳线，无冲高回落
    pub kline_strong_bull: bool,
}

impl RuleOutcomes {
    /// 未通过的规则名称
    pub fn failed(&self) -> Vec<&'static str> {
        [
            ("volume_expansion", self.volume_expansion),
            ("above_short_ma", self.above_short_ma),
            ("turnover_ge_5pct", self.turnover_ge_5pct),
            ("kline_strong_bull", self.kline_strong_bull),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect()
    }

    pub fn all_passed(&self) -> bool {
        self.volume_expansion && self.above_short_ma && self.turnover_ge_5pct && self.kline_strong_bull
    }
}

/// 候选股票
///
/// 由题材聚合生成，获取 K 线并计算指标后交给规则评估，最后序列化输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// 六位股票代码
    pub stock_code: String,
    /// 股票名称
    pub stock_name: String,
    /// 人气排名
    pub stock_hot_rank: u32,
    /// 人气热度
    pub stock_hot_heat: f64,
    /// 题材排名（从 1 开始）
    pub theme_rank: usize,
    /// 题材代码
    pub theme_code: String,
    /// 题材名称
    pub theme_name: String,
    /// 题材累计热度
    pub theme_total_heat: f64,
    /// 题材内排名（从 1 开始）
    pub theme_member_rank: usize,
    /// 该股在题材中的热度
    pub member_concept_heat: f64,

    /// 最新交易日
    pub trade_date: Option<NaiveDate>,
    /// 最新收盘价
    pub close: Option<f64>,
    /// 涨跌幅（百分比）
    pub pct_change: Option<f64>,
    /// 换手率（百分比）
    pub turnover_pct: Option<f64>,
    /// 成交量放大倍数
    pub volume_ratio: Option<f64>,
    /// K 线数据来源
    pub history_method: Option<String>,
    /// 指标快照
    pub indicators: Option<IndicatorSet>,
    /// 规则结果
    pub rules: Option<RuleOutcomes>,
    /// 是否通过全部规则
    pub passed: bool,
    /// 未通过的规则名称或失败原因
    pub fail_reasons: Vec<String>,
    /// 数据质量说明
    pub notes: Vec<String>,
}

impl Candidate {
    /// 标记为失败
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.passed = false;
        self.fail_reasons.push(reason.into());
    }
}

/// 筛选参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenParams {
    pub top_hot: usize,
    pub themes: usize,
    pub theme_members: usize,
}

/// 一次筛选的完整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    /// 运行时间（北京时间）
    pub run_at: String,
    pub params: ScreenParams,
    /// 全部候选，通过的在前
    pub results: Vec<Candidate>,
    /// 通过数量
    pub passed_count: usize,
}

/// 筛选查询参数
#[derive(Debug, Deserialize)]
pub struct ScreenQuery {
    pub top_hot: Option<usize>,
    pub themes: Option<usize>,
    pub theme_members: Option<usize>,
}
