//! 腾讯财经接口实现
//!
//! 作为区间日 K 线的备用数据源

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

use crate::error::ProviderError;

use super::common::{Symbol, TX_KLINE_API};
use super::provider::RawTable;

/// 单次请求最多返回的条数
const TX_KLINE_MAX_LEN: usize = 640;

/// 获取指定区间的前复权日 K 线
///
/// 对应 akshare 的 stock_zh_a_hist_tx；第六列为成交量（手）
pub async fn windowed_history(
    client: &Client,
    symbol: &Symbol,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<RawTable>, ProviderError> {
    let prefixed = symbol.prefixed();
    let param = format!(
        "{},day,{},{},{},qfq",
        prefixed,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        TX_KLINE_MAX_LEN
    );

    let response = client
        .get(TX_KLINE_API)
        .query(&[("_var", "kline_dayqfq"), ("param", param.as_str())])
        .header("Referer", "https://gu.qq.com/")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::Http {
            status: response.status().as_u16(),
        });
    }

    let text = response.text().await?;
    parse_kline(&text, &prefixed)
}

/// 解析腾讯 K 线
///
/// 格式: kline_dayqfq={"code":0,"data":{"sh600000":{"qfqday":[["2024-01-02","6.60","6.62","6.65","6.58","263360"]]}}}
fn parse_kline(text: &str, prefixed: &str) -> Result<Option<RawTable>, ProviderError> {
    let json_str = match text.find('=') {
        Some(idx) => &text[idx + 1..],
        None => text,
    };
    let body: Value = serde_json::from_str(json_str.trim().trim_end_matches(';'))?;

    let node = match body.get("data").and_then(|d| d.get(prefixed)) {
        Some(n) if n.is_object() => n,
        _ => return Ok(None),
    };

    // 停牌或无复权数据时只有 day 字段
    let bars = node
        .get("qfqday")
        .or_else(|| node.get("day"))
        .and_then(|v| v.as_array());

    let bars = match bars {
        Some(b) => b,
        None => return Ok(Some(RawTable::default())),
    };

    let rows = bars
        .iter()
        .filter_map(|bar| bar.as_array())
        .map(|cells| cells.iter().take(6).cloned().collect())
        .collect();

    Ok(Some(RawTable::from_columns(
        &["date", "open", "close", "high", "low", "volume"],
        rows,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stock::normalize::normalize_ohlcv;

    #[test]
    fn test_parse_kline() {
        let text = r#"kline_dayqfq={"code":0,"msg":"","data":{"sh600000":{"qfqday":[["2024-01-02","6.60","6.62","6.65","6.58","263360.000"],["2024-01-03","6.62","6.70","6.72","6.60","363360.000",{"nd":"2023"}]]}}}"#;
        let table = parse_kline(text, "sh600000").unwrap().unwrap();
        let series = normalize_ohlcv(&table, "sh600000").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.records[0].close, 6.62);
        assert_eq!(series.records[1].high, 6.72);
        assert_eq!(series.records[1].volume, 363360.0);
        assert_eq!(series.records[1].turnover_rate, None);
    }

    #[test]
    fn test_parse_kline_unknown_symbol() {
        let text = r#"kline_dayqfq={"code":0,"msg":"","data":[]}"#;
        assert!(parse_kline(text, "sh600000").unwrap().is_none());
    }

    #[test]
    fn test_parse_kline_day_fallback() {
        let text = r#"kline_dayqfq={"code":0,"data":{"sz000001":{"day":[["2024-01-02","9.0","9.1","9.2","8.9","1000"]]}}}"#;
        let table = parse_kline(text, "sz000001").unwrap().unwrap();
        assert_eq!(table.len(), 1);
    }
}
