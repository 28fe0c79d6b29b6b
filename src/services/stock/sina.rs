//! 新浪财经股票接口实现
//!
//! 提供全量日 K 线与实时行情
//! 对接 https://quotes.sina.cn 和 https://hq.sinajs.cn

use reqwest::Client;
use serde_json::{json, Value};

use crate::error::ProviderError;

use super::common::{strip_jsonp, Symbol, SINA_KLINE_API, SINA_KLINE_MAX_LEN, SINA_REALTIME_API};
use super::provider::RawTable;

/// 获取股票全量日 K 线（最多 1023 条）
///
/// 对应 akshare 的 stock_zh_a_daily，列名为 day/open/high/low/close/volume
pub async fn daily_history(client: &Client, symbol: &Symbol) -> Result<Option<RawTable>, ProviderError> {
    let prefixed = symbol.prefixed();
    let datalen = SINA_KLINE_MAX_LEN.to_string();

    let response = client
        .get(SINA_KLINE_API)
        .query(&[
            ("symbol", prefixed.as_str()),
            ("scale", "240"),
            ("ma", "no"),
            ("datalen", datalen.as_str()),
        ])
        .header("Referer", "https://finance.sina.com.cn/")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::Http {
            status: response.status().as_u16(),
        });
    }

    let text = response.text().await?;
    parse_kline(&text)
}

/// 解析新浪日 K 线 JSONP
///
/// 格式: =([{day:"2024-01-01",open:"10.00",high:"10.50",low:"9.80",close:"10.20",volume:"123456"},...]);
fn parse_kline(data: &str) -> Result<Option<RawTable>, ProviderError> {
    if data.trim_end().ends_with("(null);") || data.contains("=(null)") {
        return Ok(None);
    }

    let json_str = match strip_jsonp(data, "([", "])") {
        Some(s) => s,
        None => {
            if data.contains("([])") {
                return Ok(Some(RawTable::default()));
            }
            return Err(ProviderError::Parse("无法定位K线数据".to_string()));
        }
    };

    let items: Vec<Value> = serde_json::from_str(&json_str)?;
    let rows = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    Ok(Some(RawTable::new(rows)))
}

/// 获取单只股票实时行情
///
/// 对接新浪财经实时行情 API: https://hq.sinajs.cn/list=<symbol>，响应为 GBK 编码
pub async fn quote(client: &Client, symbol: &Symbol) -> Result<Option<RawTable>, ProviderError> {
    let url = format!("{}/list={}", SINA_REALTIME_API, symbol.prefixed());

    let response = client
        .get(&url)
        .header("Referer", "https://finance.sina.com.cn/")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::Http {
            status: response.status().as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    let text = encoding_rs::GBK.decode(&bytes).0.to_string();

    parse_quote(&text, symbol)
}

/// 解析新浪股票实时数据
///
/// 格式: var hq_str_sh600000="浦发银行,10.00,10.01,10.05,10.07,9.98,10.05,10.06,123456,123456789,...";
fn parse_quote(data: &str, symbol: &Symbol) -> Result<Option<RawTable>, ProviderError> {
    let start = data
        .find('"')
        .ok_or_else(|| ProviderError::Parse("无法解析响应数据".to_string()))?;
    let end = data
        .rfind('"')
        .ok_or_else(|| ProviderError::Parse("无法解析响应数据".to_string()))?;
    if end <= start {
        return Err(ProviderError::Parse("无法解析响应数据".to_string()));
    }
    let content = &data[start + 1..end];

    // 代码无效或已退市时内容为空
    if content.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = content.split(',').collect();
    if fields.len() < 10 {
        return Err(ProviderError::Parse("数据字段不足".to_string()));
    }

    let prev_close = fields[2].parse::<f64>().unwrap_or(0.0);
    let price = fields[3].parse::<f64>().unwrap_or(0.0);
    let change_percent = if prev_close > 0.0 {
        (price - prev_close) / prev_close * 100.0
    } else {
        0.0
    };

    Ok(Some(RawTable::from_columns(
        &["代码", "名称", "最新价", "涨跌幅"],
        vec![vec![
            json!(symbol.code),
            json!(fields[0]),
            json!(price),
            json!(change_percent),
        ]],
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stock::normalize::{normalize_ohlcv, normalize_quotes};

    #[test]
    fn test_parse_kline() {
        let text = r#"/*<script>location.href='//sina.com';</script>*/
=([{"day":"2024-01-02","open":"10.000","high":"10.200","low":"9.900","close":"10.100","volume":"123456"},{"day":"2024-01-03","open":"10.100","high":"10.300","low":"10.000","close":"10.250","volume":"223456"}]);"#;
        let table = parse_kline(text).unwrap().unwrap();
        assert_eq!(table.len(), 2);

        let series = normalize_ohlcv(&table, "sh600000").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.records[1].close, 10.25);
        assert_eq!(series.records[0].volume, 123456.0);
    }

    #[test]
    fn test_parse_kline_null_is_none() {
        assert!(parse_kline("=(null);").unwrap().is_none());
        assert!(parse_kline("garbage").is_err());
    }

    #[test]
    fn test_parse_quote() {
        let symbol = Symbol::parse("600000").unwrap();
        let text = r#"var hq_str_sh600000="浦发银行,10.00,10.00,10.50,10.60,9.98,10.49,10.50,123456,123456789,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2024-01-02,15:00:00,00";"#;
        let table = parse_quote(text, &symbol).unwrap().unwrap();
        let rows = normalize_quotes(&table);
        assert_eq!(rows[0].name.as_deref(), Some("浦发银行"));
        assert_eq!(rows[0].price, Some(10.5));
        assert!((rows[0].change_percent.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(rows[0].turnover_rate, None);
    }

    #[test]
    fn test_parse_quote_empty_is_none() {
        let symbol = Symbol::parse("600000").unwrap();
        assert!(parse_quote(r#"var hq_str_sh600000="";"#, &symbol).unwrap().is_none());
    }
}
