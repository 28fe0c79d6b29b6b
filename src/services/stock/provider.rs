//! 数据源边界
//!
//! 上游数据源以一组具名查询函数的形式出现，每个函数返回一张
//! 列名各不相同的表。这里把查询函数枚举为 `ProviderCall`，
//! 由 `MarketDataProvider` 统一执行，列名差异交给 normalize 模块处理。

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::ProviderError;
use crate::models::AdjustMode;

use super::common::Symbol;

/// 数据源返回的原始表格，每行是一组 列名 → 单元格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Map<String, Value>>,
}

impl RawTable {
    pub fn new(rows: Vec<Map<String, Value>>) -> Self {
        Self { rows }
    }

    /// 按列名和行数据构建表格，行长度不足时忽略多余列
    pub fn from_columns(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .zip(cells)
                    .map(|(col, cell)| (col.to_string(), cell))
                    .collect::<Map<String, Value>>()
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 所有出现过的列名
    pub fn columns(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.keys().map(|k| k.as_str()))
            .collect()
    }

    /// 任意一行含有该列
    pub fn has_column(&self, name: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(name))
    }
}

/// 上游具名查询函数
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    /// 全量日线（新浪）
    DailyHistory { symbol: Symbol },
    /// 指定区间的日线（东方财富）
    WindowedHistory {
        symbol: Symbol,
        start: NaiveDate,
        end: NaiveDate,
        adjust: AdjustMode,
    },
    /// 备用数据源的区间日线（腾讯）
    AltWindowedHistory {
        symbol: Symbol,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// 个股人气榜
    HotRank,
    /// 个股热门题材关键词
    HotKeywords { symbol: Symbol },
    /// 沪深京 A 股实时行情快照
    SpotSnapshot,
    /// 单只股票实时行情
    Quote { symbol: Symbol },
}

impl ProviderCall {
    /// 查询函数名称，用于日志
    pub fn name(&self) -> &'static str {
        match self {
            ProviderCall::DailyHistory { .. } => "stock_zh_a_daily",
            ProviderCall::WindowedHistory { .. } => "stock_zh_a_hist",
            ProviderCall::AltWindowedHistory { .. } => "stock_zh_a_hist_tx",
            ProviderCall::HotRank => "stock_hot_rank_em",
            ProviderCall::HotKeywords { .. } => "stock_hot_keyword_em",
            ProviderCall::SpotSnapshot => "stock_zh_a_spot_em",
            ProviderCall::Quote { .. } => "stock_individual_spot",
        }
    }
}

impl fmt::Display for ProviderCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderCall::DailyHistory { symbol }
            | ProviderCall::HotKeywords { symbol }
            | ProviderCall::Quote { symbol } => write!(f, "{}({})", self.name(), symbol),
            ProviderCall::WindowedHistory {
                symbol,
                start,
                end,
                adjust,
            } => write!(
                f,
                "{}({}, {}~{}, {})",
                self.name(),
                symbol,
                start.format("%Y%m%d"),
                end.format("%Y%m%d"),
                adjust.label()
            ),
            ProviderCall::AltWindowedHistory { symbol, start, end } => write!(
                f,
                "{}({}, {}~{})",
                self.name(),
                symbol,
                start.format("%Y%m%d"),
                end.format("%Y%m%d")
            ),
            ProviderCall::HotRank | ProviderCall::SpotSnapshot => write!(f, "{}()", self.name()),
        }
    }
}

/// 行情数据源
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 执行一次查询；`Ok(None)` 表示数据源没有返回任何内容
    async fn call(&self, call: &ProviderCall) -> Result<Option<RawTable>, ProviderError>;
}
