//! 股票数据模型
//!
//! 定义 K 线序列、实时行情、人气榜等数据结构

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 单日 K 线（OHLCV）
///
/// 只有 close > 0 的记录才会进入序列；缺失的最高价、最低价回退为收盘价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    /// 交易日期
    pub trade_date: NaiveDate,
    /// 开盘价
    pub open: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 收盘价
    pub close: f64,
    /// 成交量
    pub volume: f64,
    /// 成交额
    pub turnover: f64,
    /// 换手率（百分比，数据源提供时才有）
    pub turnover_rate: Option<f64>,
}

/// 归一化过程中需要告知调用方的情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesNote {
    /// 缺少成交量列，按 成交额 ÷ 收盘价 估算
    VolumeEstimated,
    /// 因收盘价无效或日期无法解析而丢弃的行数
    DroppedRows { count: usize },
    /// 重复日期被合并的行数（保留最后一条）
    DuplicateDates { count: usize },
}

/// 单只股票的 K 线序列，按日期升序、日期不重复
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhlcvSeries {
    /// 股票代码（带市场前缀）
    pub symbol: String,
    /// K 线记录
    pub records: Vec<OhlcvRecord>,
    /// 归一化说明
    pub notes: Vec<SeriesNote>,
}

impl OhlcvSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 最新一条记录
    pub fn last(&self) -> Option<&OhlcvRecord> {
        self.records.last()
    }

    /// 倒数第二条记录
    pub fn previous(&self) -> Option<&OhlcvRecord> {
        self.records.len().checked_sub(2).and_then(|i| self.records.get(i))
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.volume).collect()
    }

    /// 只保留 [start, end] 区间内的记录
    pub fn filter_window(&self, start: NaiveDate, end: NaiveDate) -> OhlcvSeries {
        OhlcvSeries {
            symbol: self.symbol.clone(),
            records: self
                .records
                .iter()
                .filter(|r| r.trade_date >= start && r.trade_date <= end)
                .cloned()
                .collect(),
            notes: self.notes.clone(),
        }
    }
}

/// 复权方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustMode {
    /// 前复权
    Forward,
    /// 后复权
    Backward,
    /// 不复权
    None,
}

impl AdjustMode {
    /// 东方财富 fqt 参数
    pub fn eastmoney_fqt(&self) -> &'static str {
        match self {
            AdjustMode::Forward => "1",
            AdjustMode::Backward => "2",
            AdjustMode::None => "0",
        }
    }

    /// akshare 风格的复权标记
    pub fn label(&self) -> &'static str {
        match self {
            AdjustMode::Forward => "qfq",
            AdjustMode::Backward => "hfq",
            AdjustMode::None => "none",
        }
    }
}

/// 单次数据源尝试的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// 成功，窗口内记录数
    Success { rows: usize },
    /// 数据源返回空表
    EmptyResult,
    /// 有数据，但过滤到请求窗口后为空
    EmptyAfterFilter { raw_rows: usize },
    /// 列名无法识别
    SchemaMismatch { message: String },
    /// 请求失败（重试耗尽）
    Failed { message: String },
}

/// 数据源尝试记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAttempt {
    /// 策略名称
    pub method: String,
    /// 结果
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// 历史数据获取结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResult {
    /// 归一化后的 K 线序列
    pub series: OhlcvSeries,
    /// 成功的策略名称
    pub method: String,
    /// 请求窗口开始日期
    pub start_date: NaiveDate,
    /// 请求窗口结束日期
    pub end_date: NaiveDate,
    /// 依次尝试过的策略
    pub attempts: Vec<StrategyAttempt>,
}

/// 实时行情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    /// 股票代码
    pub symbol: String,
    /// 股票名称
    pub name: Option<String>,
    /// 最新价
    pub price: Option<f64>,
    /// 涨跌幅（百分比）
    pub change_percent: Option<f64>,
    /// 换手率（百分比）
    pub turnover_rate: Option<f64>,
    /// 更新时间
    pub updated_at: String,
}

/// 个股人气榜条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotStock {
    /// 人气排名（从 1 开始）
    pub rank: u32,
    /// 六位股票代码
    pub code: String,
    /// 股票名称
    pub name: String,
    /// 人气热度
    pub heat: f64,
}

/// 个股关联的热点题材
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptKeyword {
    /// 题材代码
    pub concept_code: String,
    /// 题材名称
    pub concept_name: String,
    /// 该股在题材中的热度
    pub heat: f64,
}

/// 历史数据查询参数
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 回看月数
    pub months: Option<u32>,
    /// 是否允许扩大窗口
    pub extended: Option<bool>,
}

/// 人气榜查询参数
#[derive(Debug, Deserialize)]
pub struct HotRankQuery {
    /// 返回数量限制
    pub limit: Option<usize>,
}
