//! 列名归一化
//!
//! 不同数据源、不同接口的列名各不相同（中文、英文、缩写）。
//! 每个逻辑字段在这里声明一张有序同义列表，所有数据源共用；
//! 按顺序探测，取第一个存在且非缺失的值。

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::MarketDataError;
use crate::models::{ConceptKeyword, HotStock, OhlcvRecord, OhlcvSeries, SeriesNote};

use super::common::{is_missing, value_to_f64};
use super::provider::RawTable;

/// 数值单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// 原样使用
    Plain,
    /// 已经是百分比（5.2 表示 5.2%）
    Percent,
    /// 小数比例（0.052 表示 5.2%）
    Fraction,
}

/// 一个逻辑字段及其同义列
#[derive(Debug)]
pub struct FieldSpec {
    pub field: &'static str,
    pub synonyms: &'static [(&'static str, Unit)],
}

// ==================== K 线字段 ====================

pub const DATE: FieldSpec = FieldSpec {
    field: "date",
    synonyms: &[
        ("日期", Unit::Plain),
        ("date", Unit::Plain),
        ("day", Unit::Plain),
        ("trade_date", Unit::Plain),
        ("交易日期", Unit::Plain),
    ],
};

pub const OPEN: FieldSpec = FieldSpec {
    field: "open",
    synonyms: &[("开盘", Unit::Plain), ("open", Unit::Plain), ("开盘价", Unit::Plain)],
};

pub const HIGH: FieldSpec = FieldSpec {
    field: "high",
    synonyms: &[("最高", Unit::Plain), ("high", Unit::Plain), ("最高价", Unit::Plain)],
};

pub const LOW: FieldSpec = FieldSpec {
    field: "low",
    synonyms: &[("最低", Unit::Plain), ("low", Unit::Plain), ("最低价", Unit::Plain)],
};

pub const CLOSE: FieldSpec = FieldSpec {
    field: "close",
    synonyms: &[("收盘", Unit::Plain), ("close", Unit::Plain), ("收盘价", Unit::Plain)],
};

pub const VOLUME: FieldSpec = FieldSpec {
    field: "volume",
    synonyms: &[("成交量", Unit::Plain), ("volume", Unit::Plain), ("vol", Unit::Plain)],
};

/// 成交额（金额）
pub const TURNOVER: FieldSpec = FieldSpec {
    field: "turnover",
    synonyms: &[
        ("成交额", Unit::Plain),
        ("amount", Unit::Plain),
        ("turnover_amount", Unit::Plain),
    ],
};

/// 换手率；新浪日线的 turnover 列是小数比例
pub const TURNOVER_RATE: FieldSpec = FieldSpec {
    field: "turnover_rate",
    synonyms: &[
        ("换手率", Unit::Percent),
        ("turnover_rate", Unit::Percent),
        ("turnover", Unit::Fraction),
    ],
};

// ==================== 行情 / 人气榜字段 ====================

pub const CODE: FieldSpec = FieldSpec {
    field: "code",
    synonyms: &[("代码", Unit::Plain), ("股票代码", Unit::Plain), ("code", Unit::Plain)],
};

pub const NAME: FieldSpec = FieldSpec {
    field: "name",
    synonyms: &[("名称", Unit::Plain), ("股票名称", Unit::Plain), ("name", Unit::Plain)],
};

pub const PRICE: FieldSpec = FieldSpec {
    field: "price",
    synonyms: &[("最新价", Unit::Plain), ("price", Unit::Plain), ("trade", Unit::Plain)],
};

pub const CHANGE_PERCENT: FieldSpec = FieldSpec {
    field: "change_percent",
    synonyms: &[
        ("涨跌幅", Unit::Percent),
        ("change_percent", Unit::Percent),
        ("changepercent", Unit::Percent),
    ],
};

pub const RANK: FieldSpec = FieldSpec {
    field: "rank",
    synonyms: &[("当前排名", Unit::Plain), ("rank", Unit::Plain)],
};

pub const HEAT: FieldSpec = FieldSpec {
    field: "heat",
    synonyms: &[("热度", Unit::Plain), ("heat", Unit::Plain)],
};

// ==================== 题材关键词字段 ====================

pub const KEYWORD_TIME: FieldSpec = FieldSpec {
    field: "timestamp",
    synonyms: &[("时间", Unit::Plain), ("timestamp", Unit::Plain)],
};

pub const CONCEPT_NAME: FieldSpec = FieldSpec {
    field: "concept_name",
    synonyms: &[("概念名称", Unit::Plain), ("concept_name", Unit::Plain)],
};

pub const CONCEPT_CODE: FieldSpec = FieldSpec {
    field: "concept_code",
    synonyms: &[("概念代码", Unit::Plain), ("concept_code", Unit::Plain)],
};

pub const CONCEPT_HEAT: FieldSpec = FieldSpec {
    field: "concept_heat",
    synonyms: &[("热度", Unit::Plain), ("concept_heat", Unit::Plain)],
};

impl FieldSpec {
    /// 在一行中探测第一个存在且非缺失的同义列
    pub fn probe<'a>(&self, row: &'a Map<String, Value>) -> Option<(&'a Value, Unit)> {
        self.synonyms.iter().find_map(|(name, unit)| {
            row.get(*name)
                .filter(|v| !is_missing(v))
                .map(|v| (v, *unit))
        })
    }

    /// 表中是否出现过任一同义列
    pub fn resolves_in(&self, table: &RawTable) -> bool {
        self.synonyms.iter().any(|(name, _)| table.has_column(name))
    }

    /// 读取数值并换算：百分比字段统一为百分比
    pub fn number(&self, row: &Map<String, Value>) -> Option<f64> {
        let (value, unit) = self.probe(row)?;
        let v = value_to_f64(value)?;
        Some(match unit {
            Unit::Plain | Unit::Percent => v,
            Unit::Fraction => v * 100.0,
        })
    }

    /// 读取文本
    pub fn text(&self, row: &Map<String, Value>) -> Option<String> {
        let (value, _) = self.probe(row)?;
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 解析日期，支持 2024-01-02 / 20240102 / 2024/01/02 及带时间的写法
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let head: String = raw.chars().take(10).collect();

    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&head, fmt).ok())
        .or_else(|| {
            let digits: String = raw.chars().take(8).collect();
            NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()
        })
}

/// 将一次数据源返回的表格归一化为 K 线序列
///
/// 日期列和收盘价列都无法识别时返回 Schema 错误；
/// 缺少成交量列但有成交额时，按 成交额 ÷ 收盘价 估算并记录说明。
pub fn normalize_ohlcv(table: &RawTable, symbol: &str) -> Result<OhlcvSeries, MarketDataError> {
    if !DATE.resolves_in(table) {
        return Err(MarketDataError::Schema { field: DATE.field });
    }
    if !CLOSE.resolves_in(table) {
        return Err(MarketDataError::Schema { field: CLOSE.field });
    }

    let estimate_volume = !VOLUME.resolves_in(table) && TURNOVER.resolves_in(table);
    let mut notes = Vec::new();
    if estimate_volume {
        log::warn!("{} 缺少成交量列，使用 成交额/收盘价 估算", symbol);
        notes.push(SeriesNote::VolumeEstimated);
    }

    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0usize;

    for row in &table.rows {
        let trade_date = match DATE.probe(row).and_then(|(v, _)| parse_date(v)) {
            Some(d) => d,
            None => {
                dropped += 1;
                continue;
            }
        };
        let close = match CLOSE.number(row) {
            Some(c) if c > 0.0 => c,
            _ => {
                dropped += 1;
                continue;
            }
        };

        let positive_or_close = |spec: &FieldSpec| {
            spec.number(row).filter(|v| *v > 0.0).unwrap_or(close)
        };
        let turnover = TURNOVER.number(row).unwrap_or(0.0).max(0.0);
        let volume = if estimate_volume {
            turnover / close
        } else {
            VOLUME.number(row).unwrap_or(0.0).max(0.0)
        };

        records.push(OhlcvRecord {
            trade_date,
            open: positive_or_close(&OPEN),
            high: positive_or_close(&HIGH),
            low: positive_or_close(&LOW),
            close,
            volume,
            turnover,
            turnover_rate: TURNOVER_RATE.number(row),
        });
    }

    // 稳定排序后同日期保留最后一条
    records.sort_by_key(|r| r.trade_date);
    let before = records.len();
    let mut deduped: Vec<OhlcvRecord> = Vec::with_capacity(before);
    for record in records {
        match deduped.last_mut() {
            Some(last) if last.trade_date == record.trade_date => *last = record,
            _ => deduped.push(record),
        }
    }
    let duplicates = before - deduped.len();

    if dropped > 0 {
        log::debug!("{} 丢弃 {} 行无效数据", symbol, dropped);
        notes.push(SeriesNote::DroppedRows { count: dropped });
    }
    if duplicates > 0 {
        notes.push(SeriesNote::DuplicateDates { count: duplicates });
    }

    Ok(OhlcvSeries {
        symbol: symbol.to_string(),
        records: deduped,
        notes,
    })
}

/// 去掉 SH/SZ/BJ 前缀，保留六位代码
fn strip_market_prefix(code: &str) -> String {
    let trimmed = code.trim();
    let upper = trimmed.to_uppercase();
    ["SH", "SZ", "BJ"]
        .iter()
        .find_map(|p| upper.strip_prefix(p).map(|rest| rest.to_string()))
        .unwrap_or_else(|| trimmed.to_string())
}

/// 归一化个股人气榜，按排名升序截取前 top_n
pub fn normalize_hot_rank(table: &RawTable, top_n: usize) -> Result<Vec<HotStock>, MarketDataError> {
    if !CODE.resolves_in(table) {
        return Err(MarketDataError::Schema { field: CODE.field });
    }

    let mut stocks: Vec<HotStock> = table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let code = strip_market_prefix(&CODE.text(row)?);
            let rank = RANK
                .number(row)
                .filter(|r| *r >= 1.0)
                .map(|r| r as u32)
                .unwrap_or(idx as u32 + 1);
            Some(HotStock {
                rank,
                name: NAME.text(row).unwrap_or_default(),
                heat: HEAT.number(row).unwrap_or(0.0),
                code,
            })
        })
        .collect();

    stocks.sort_by_key(|s| s.rank);
    stocks.truncate(top_n);
    Ok(stocks)
}

/// 归一化个股题材关键词
///
/// 热度无法解析的行被丢弃；同一题材代码按时间保留最后一条
pub fn normalize_keywords(table: &RawTable) -> Result<Vec<ConceptKeyword>, MarketDataError> {
    if !CONCEPT_CODE.resolves_in(table) {
        return Err(MarketDataError::Schema {
            field: CONCEPT_CODE.field,
        });
    }

    let mut rows: Vec<(String, ConceptKeyword)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let keyword = ConceptKeyword {
                concept_code: CONCEPT_CODE.text(row).filter(|s| !s.is_empty())?,
                concept_name: CONCEPT_NAME.text(row).filter(|s| !s.is_empty())?,
                heat: CONCEPT_HEAT.number(row)?,
            };
            Some((KEYWORD_TIME.text(row).unwrap_or_default(), keyword))
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, ConceptKeyword> = HashMap::new();
    for (_, keyword) in rows {
        if !latest.contains_key(&keyword.concept_code) {
            order.push(keyword.concept_code.clone());
        }
        latest.insert(keyword.concept_code.clone(), keyword);
    }

    Ok(order
        .into_iter()
        .filter_map(|code| latest.remove(&code))
        .collect())
}

/// 行情表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub code: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub change_percent: Option<f64>,
    /// 换手率（百分比）
    pub turnover_rate: Option<f64>,
}

/// 归一化行情表（全市场快照或单只行情）
pub fn normalize_quotes(table: &RawTable) -> Vec<QuoteRow> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            Some(QuoteRow {
                code: strip_market_prefix(&CODE.text(row)?),
                name: NAME.text(row).filter(|s| !s.is_empty()),
                price: PRICE.number(row),
                change_percent: CHANGE_PERCENT.number(row),
                turnover_rate: TURNOVER_RATE.number(row),
            })
        })
        .collect()
}
