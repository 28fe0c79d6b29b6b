//! 公共常量和辅助函数

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use crate::error::MarketDataError;

// ==================== 新浪财经 API 常量 ====================

/// 新浪实时行情 API
pub const SINA_REALTIME_API: &str = "https://hq.sinajs.cn";
/// 新浪日 K 线 API（scale=240 为日线）
pub const SINA_KLINE_API: &str =
    "https://quotes.sina.cn/cn/api/jsonp_v2.php/=/CN_MarketDataService.getKLineData";
/// 新浪日 K 线单次最多返回条数
pub const SINA_KLINE_MAX_LEN: usize = 1023;

// ==================== 东方财富 API 常量 ====================

/// 东方财富历史 K 线 API
pub const EM_KLINE_API: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
/// 东方财富单只股票实时行情 API
pub const EM_QUOTE_API: &str = "https://push2.eastmoney.com/api/qt/stock/get";
/// 东方财富多只股票行情 API
pub const EM_ULIST_API: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
/// 东方财富沪深京 A 股实时行情列表 API
pub const EM_SPOT_API: &str = "https://82.push2.eastmoney.com/api/qt/clist/get";
/// 东方财富个股人气榜 API
pub const EM_HOT_RANK_API: &str = "https://emappdata.eastmoney.com/stockrank/getAllCurrentList";
/// 东方财富个股热门关键词 API
pub const EM_HOT_KEYWORD_API: &str =
    "https://emappdata.eastmoney.com/stockrank/getHotStockRankList";
/// 东方财富 A 股市场过滤条件
pub const EM_A_SHARE_FS: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048";

// ==================== 腾讯财经 API 常量 ====================

/// 腾讯复权 K 线 API
pub const TX_KLINE_API: &str = "https://proxy.finance.qq.com/ifzqgtimg/appstock/app/newfqkline/get";

/// 一个"月"按 30 天计算
pub const DAYS_PER_MONTH: i64 = 30;

/// 获取北京时间字符串（ISO 8601 格式，带+08:00时区）
pub fn get_beijing_time() -> String {
    Utc::now().with_timezone(&Shanghai).to_rfc3339()
}

/// 北京时间的今天
pub fn beijing_today() -> NaiveDate {
    Utc::now().with_timezone(&Shanghai).date_naive()
}

/// 回看月数上限
pub const MAX_LOOKBACK_MONTHS: u32 = 120;

/// 按月数回推开始日期
///
/// 月数超过 [`MAX_LOOKBACK_MONTHS`] 按上限计算，结果不早于 `NaiveDate::MIN`
pub fn months_before(end: NaiveDate, months: u32) -> NaiveDate {
    let days = DAYS_PER_MONTH * i64::from(months.min(MAX_LOOKBACK_MONTHS));
    end.checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

/// 交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Sh,
    Sz,
    Bj,
}

impl Market {
    pub fn prefix(&self) -> &'static str {
        match self {
            Market::Sh => "sh",
            Market::Sz => "sz",
            Market::Bj => "bj",
        }
    }

    /// 东方财富 secid 中的市场编号
    pub fn eastmoney_id(&self) -> u8 {
        match self {
            Market::Sh => 1,
            Market::Sz | Market::Bj => 0,
        }
    }
}

/// 规范化后的 A 股代码
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    /// 六位数字代码
    pub code: String,
    pub market: Market,
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?i)(sh|sz|bj)?(\d{6})$").expect("股票代码正则合法"))
}

impl Symbol {
    /// 解析股票代码，支持 600000 / sh600000 / SZ000001 等写法
    pub fn parse(raw: &str) -> Result<Self, MarketDataError> {
        let clean = raw.trim();
        let caps = symbol_pattern()
            .captures(clean)
            .ok_or_else(|| MarketDataError::InvalidSymbol(raw.to_string()))?;

        let code = caps
            .get(2)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| MarketDataError::InvalidSymbol(raw.to_string()))?;

        let market = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
            Some(p) if p == "sh" => Market::Sh,
            Some(p) if p == "bj" => Market::Bj,
            Some(_) => Market::Sz,
            None => Self::infer_market(&code),
        };

        Ok(Self { code, market })
    }

    /// 根据代码首位推断交易所
    fn infer_market(code: &str) -> Market {
        match code.chars().next() {
            Some('6') | Some('9') => Market::Sh,
            Some('4') | Some('8') => Market::Bj,
            _ => Market::Sz,
        }
    }

    /// 带前缀代码，如 sh600000
    pub fn prefixed(&self) -> String {
        format!("{}{}", self.market.prefix(), self.code)
    }

    /// 东方财富 secid，如 1.600000
    pub fn secid(&self) -> String {
        format!("{}.{}", self.market.eastmoney_id(), self.code)
    }

    /// 东方财富 APP 接口使用的大写前缀代码，如 SH600000
    pub fn upper_prefixed(&self) -> String {
        self.prefixed().to_uppercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefixed())
    }
}

/// 从 JSONP 响应中截取 JSON 部分
pub fn strip_jsonp(text: &str, open: &str, close: &str) -> Option<String> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(text[start + open.len() - 1..end + 1].to_string())
}

/// 将数据源返回的单元格转换为浮点数，失败返回 None
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() || cleaned == "-" {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// 单元格是否为缺失值
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let t = s.trim();
            t.is_empty() || t == "-" || t.eq_ignore_ascii_case("nan")
        }
        Value::Number(n) => n.as_f64().map(|v| !v.is_finite()).unwrap_or(true),
        _ => false,
    }
}
