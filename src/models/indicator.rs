//! 技术指标模型
//!
//! 每个指标独立计算，数据不足时标记为 insufficient_data

use serde::{Deserialize, Serialize};

/// 均线趋势
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSignal {
    Up,
    Down,
    InsufficientData,
}

/// 均线交叉
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossSignal {
    /// 金叉：MA5 上穿 MA20
    GoldenCross,
    /// 死叉：MA5 下穿 MA20
    DeathCross,
    None,
    InsufficientData,
}

/// MACD 信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdSignal {
    Bullish,
    Bearish,
    InsufficientData,
}

/// RSI 信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
    InsufficientData,
}

/// 收盘价相对布林带的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    Above,
    Below,
    Middle,
    InsufficientData,
}

/// 移动平均线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    /// 不足 60 日时按全部数据计算
    pub ma60: Option<f64>,
    pub trend: TrendSignal,
    pub cross: CrossSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
    pub label: MacdSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsi {
    pub value: Option<f64>,
    pub label: RsiSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Option<f64>,
    pub middle: Option<f64>,
    pub lower: Option<f64>,
    pub position: BandPosition,
}

/// 技术指标集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// 计算所用的数据条数
    pub periods: usize,
    pub moving_averages: MovingAverages,
    pub macd: Macd,
    pub rsi: Rsi,
    pub bollinger: BollingerBands,
}

/// 指标查询参数
#[derive(Debug, Deserialize)]
pub struct IndicatorQuery {
    /// 回看月数
    pub months: Option<u32>,
}
