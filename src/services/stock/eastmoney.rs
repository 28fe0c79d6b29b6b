//! 东方财富接口实现
//!
//! 提供区间日 K 线、个股人气榜、热门题材关键词、全市场快照和单只行情。
//! 返回的表格列名与 akshare 对应函数保持一致（中文列名）。

use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::models::AdjustMode;

use super::common::{
    Symbol, EM_A_SHARE_FS, EM_HOT_KEYWORD_API, EM_HOT_RANK_API, EM_KLINE_API, EM_QUOTE_API,
    EM_SPOT_API, EM_ULIST_API,
};
use super::provider::RawTable;

/// K 线列名，对应 fields2=f51..f61
const KLINE_COLUMNS: [&str; 11] = [
    "日期", "开盘", "收盘", "最高", "最低", "成交量", "成交额", "振幅", "涨跌幅", "涨跌额", "换手率",
];

/// 人气榜 APP 接口的固定参数
const EM_APP_ID: &str = "appId01";
const EM_GLOBAL_ID: &str = "786e4c21-70dc-435a-93bb-38";

fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Http {
            status: response.status().as_u16(),
        })
    }
}

/// 按映射表重命名字段，未出现在映射表中的字段丢弃
fn rename_fields(item: &Map<String, Value>, mapping: &[(&str, &str)]) -> Map<String, Value> {
    mapping
        .iter()
        .filter_map(|(from, to)| item.get(*from).map(|v| (to.to_string(), v.clone())))
        .collect()
}

/// 获取指定区间日 K 线
///
/// 对应 akshare 的 stock_zh_a_hist
pub async fn windowed_history(
    client: &Client,
    symbol: &Symbol,
    start: NaiveDate,
    end: NaiveDate,
    adjust: AdjustMode,
) -> Result<Option<RawTable>, ProviderError> {
    let secid = symbol.secid();
    let beg = start.format("%Y%m%d").to_string();
    let end = end.format("%Y%m%d").to_string();

    let response = client
        .get(EM_KLINE_API)
        .query(&[
            ("secid", secid.as_str()),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
            ("ut", "7eea3edcaed734bea9cbfc24409ed989"),
            ("klt", "101"),
            ("fqt", adjust.eastmoney_fqt()),
            ("beg", beg.as_str()),
            ("end", end.as_str()),
        ])
        .header("Referer", "https://quote.eastmoney.com/")
        .send()
        .await?;

    let body: Value = ensure_success(response)?.json().await?;
    parse_kline(&body)
}

/// 解析 K 线响应：data.klines 为逗号分隔的字符串数组
fn parse_kline(body: &Value) -> Result<Option<RawTable>, ProviderError> {
    let data = match body.get("data") {
        Some(Value::Null) | None => return Ok(None),
        Some(d) => d,
    };

    let klines = data
        .get("klines")
        .and_then(|k| k.as_array())
        .ok_or_else(|| ProviderError::Parse("缺少 klines 字段".to_string()))?;

    let rows = klines
        .iter()
        .filter_map(|line| line.as_str())
        .map(|line| line.split(',').map(|cell| json!(cell)).collect())
        .collect();

    Ok(Some(RawTable::from_columns(&KLINE_COLUMNS, rows)))
}

/// 获取个股人气榜
///
/// 对应 akshare 的 stock_hot_rank_em；榜单只有代码和排名，名称通过 ulist 接口补齐
pub async fn hot_rank(client: &Client) -> Result<Option<RawTable>, ProviderError> {
    let payload = json!({
        "appId": EM_APP_ID,
        "globalId": EM_GLOBAL_ID,
        "marketType": "",
        "pageNo": 1,
        "pageSize": 100,
    });

    let response = client
        .post(EM_HOT_RANK_API)
        .json(&payload)
        .send()
        .await?;
    let body: Value = ensure_success(response)?.json().await?;

    let mut table = match parse_hot_rank(&body) {
        Some(t) => t,
        None => return Ok(None),
    };
    if table.is_empty() {
        return Ok(Some(table));
    }

    let secids: Vec<String> = table
        .rows
        .iter()
        .filter_map(|row| row.get("代码").and_then(|v| v.as_str()))
        .filter_map(|code| Symbol::parse(code).ok())
        .map(|s| s.secid())
        .collect();

    // 名称是可选信息，失败时保留无名称的榜单
    match stock_names(client, &secids).await {
        Ok(names) => {
            for row in table.rows.iter_mut() {
                let code = row
                    .get("代码")
                    .and_then(|v| v.as_str())
                    .and_then(|c| Symbol::parse(c).ok())
                    .map(|s| s.code);
                if let Some(name) = code.and_then(|c| names.get(&c).cloned()) {
                    row.insert("股票名称".to_string(), json!(name));
                }
            }
        }
        Err(e) => log::warn!("获取人气榜股票名称失败: {}", e),
    }

    Ok(Some(table))
}

fn parse_hot_rank(body: &Value) -> Option<RawTable> {
    let items = body.get("data")?.as_array()?;
    let rows = items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|item| rename_fields(item, &[("rk", "当前排名"), ("sc", "代码"), ("hotValue", "热度")]))
        .collect();
    Some(RawTable::new(rows))
}

/// 批量查询股票名称，返回 六位代码 → 名称
async fn stock_names(
    client: &Client,
    secids: &[String],
) -> Result<std::collections::HashMap<String, String>, ProviderError> {
    let joined = secids.join(",");
    let response = client
        .get(EM_ULIST_API)
        .query(&[
            ("fltt", "2"),
            ("invt", "2"),
            ("fields", "f12,f14"),
            ("secids", joined.as_str()),
        ])
        .header("Referer", "https://quote.eastmoney.com/")
        .send()
        .await?;
    let body: Value = ensure_success(response)?.json().await?;

    Ok(diff_items(&body)
        .iter()
        .filter_map(|item| {
            let code = item.get("f12")?.as_str()?.to_string();
            let name = item.get("f14")?.as_str()?.to_string();
            Some((code, name))
        })
        .collect())
}

/// push2 列表接口的 data.diff，兼容数组和对象两种形式
fn diff_items(body: &Value) -> Vec<Map<String, Value>> {
    match body.get("data").and_then(|d| d.get("diff")) {
        Some(Value::Array(items)) => items.iter().filter_map(|i| i.as_object().cloned()).collect(),
        Some(Value::Object(map)) => map.values().filter_map(|i| i.as_object().cloned()).collect(),
        _ => Vec::new(),
    }
}

/// 获取个股热门题材关键词
///
/// 对应 akshare 的 stock_hot_keyword_em
pub async fn hot_keywords(client: &Client, symbol: &Symbol) -> Result<Option<RawTable>, ProviderError> {
    let payload = json!({
        "appId": EM_APP_ID,
        "globalId": EM_GLOBAL_ID,
        "srcSecurityCode": symbol.upper_prefixed(),
    });

    let response = client
        .post(EM_HOT_KEYWORD_API)
        .json(&payload)
        .send()
        .await?;
    let body: Value = ensure_success(response)?.json().await?;
    Ok(parse_hot_keywords(&body))
}

fn parse_hot_keywords(body: &Value) -> Option<RawTable> {
    let items = body.get("data")?.as_array()?;
    let rows = items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|item| {
            rename_fields(
                item,
                &[
                    ("calcTime", "时间"),
                    ("srcSecurityCode", "股票代码"),
                    ("conceptName", "概念名称"),
                    ("conceptId", "概念代码"),
                    ("hotValue", "热度"),
                ],
            )
        })
        .collect();
    Some(RawTable::new(rows))
}

/// clist 接口单页最多返回的条数
const EM_SPOT_PAGE_SIZE: usize = 100;
/// 快照最多翻页数
const EM_SPOT_MAX_PAGES: usize = 80;

/// 获取沪深京 A 股实时行情快照
///
/// 对应 akshare 的 stock_zh_a_spot_em，换手率列 f8 已是百分比。
/// 接口单页最多 100 条，按 pn 翻页直到取满 data.total。
pub async fn spot_snapshot(client: &Client) -> Result<Option<RawTable>, ProviderError> {
    let page_size = EM_SPOT_PAGE_SIZE.to_string();
    let mut items = Vec::new();

    for page in 1..=EM_SPOT_MAX_PAGES {
        let page_no = page.to_string();
        let response = client
            .get(EM_SPOT_API)
            .query(&[
                ("pn", page_no.as_str()),
                ("pz", page_size.as_str()),
                ("po", "1"),
                ("np", "1"),
                ("fltt", "2"),
                ("invt", "2"),
                ("fid", "f3"),
                ("fs", EM_A_SHARE_FS),
                ("fields", "f2,f3,f8,f12,f14"),
            ])
            .header("Referer", "https://quote.eastmoney.com/")
            .send()
            .await?;
        let body: Value = ensure_success(response)?.json().await?;

        if body.get("data").map(|d| d.is_null()).unwrap_or(true) {
            if page == 1 {
                return Ok(None);
            }
            break;
        }

        let page_items = diff_items(&body);
        let fetched = page_items.len();
        items.extend(page_items);
        if !has_more_pages(spot_total(&body), items.len(), fetched) {
            break;
        }
    }

    log::debug!("东方财富快照共取得 {} 条", items.len());
    Ok(Some(quote_table(&items)))
}

/// data.total，全市场股票总数
fn spot_total(body: &Value) -> Option<usize> {
    body.get("data")
        .and_then(|d| d.get("total"))
        .and_then(Value::as_u64)
        .map(|t| t as usize)
}

/// 是否还需要继续翻页
fn has_more_pages(total: Option<usize>, collected: usize, page_len: usize) -> bool {
    if page_len == 0 {
        return false;
    }
    match total {
        Some(total) => collected < total,
        None => page_len >= EM_SPOT_PAGE_SIZE,
    }
}

fn quote_table(items: &[Map<String, Value>]) -> RawTable {
    RawTable::new(
        items
            .iter()
            .map(|item| {
                rename_fields(
                    item,
                    &[
                        ("f12", "代码"),
                        ("f14", "名称"),
                        ("f2", "最新价"),
                        ("f3", "涨跌幅"),
                        ("f8", "换手率"),
                    ],
                )
            })
            .collect(),
    )
}

/// 获取单只股票实时行情
///
/// fltt=2 时数值为真实小数，f168 换手率为百分比
pub async fn quote(client: &Client, symbol: &Symbol) -> Result<Option<RawTable>, ProviderError> {
    let secid = symbol.secid();
    let response = client
        .get(EM_QUOTE_API)
        .query(&[
            ("secid", secid.as_str()),
            ("fltt", "2"),
            ("invt", "2"),
            ("fields", "f43,f57,f58,f168,f170"),
        ])
        .header("Referer", "https://quote.eastmoney.com/")
        .send()
        .await?;
    let body: Value = ensure_success(response)?.json().await?;
    Ok(parse_quote(&body))
}

fn parse_quote(body: &Value) -> Option<RawTable> {
    let data = body.get("data")?.as_object()?;
    let row = rename_fields(
        data,
        &[
            ("f57", "代码"),
            ("f58", "名称"),
            ("f43", "最新价"),
            ("f170", "涨跌幅"),
            ("f168", "换手率"),
        ],
    );
    Some(RawTable::new(vec![row]))
}
