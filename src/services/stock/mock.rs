//! 测试用的脚本化数据源

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use std::sync::Mutex;

use crate::error::ProviderError;

use super::provider::{MarketDataProvider, ProviderCall, RawTable};

type Handler = dyn Fn(&ProviderCall) -> Result<Option<RawTable>, ProviderError> + Send + Sync;

/// 按闭包应答每次查询，并记录调用顺序
pub struct ScriptedProvider {
    handler: Box<Handler>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ProviderCall) -> Result<Option<RawTable>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.name()).collect()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn call(&self, call: &ProviderCall) -> Result<Option<RawTable>, ProviderError> {
        self.calls.lock().unwrap().push(call.clone());
        (self.handler)(call)
    }
}

/// 一根测试 K 线: (开, 高, 低, 收, 量)
pub type Bar = (f64, f64, f64, f64, f64);

/// 以 end 为最后一天、按自然日连续生成东方财富列名的 K 线表
pub fn bars_table(end: NaiveDate, bars: &[Bar], turnover_rate: Option<f64>) -> RawTable {
    let n = bars.len() as i64;
    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, (open, high, low, close, volume))| {
            let date = end - Duration::days(n - 1 - i as i64);
            vec![
                json!(date.format("%Y-%m-%d").to_string()),
                json!(open),
                json!(close),
                json!(high),
                json!(low),
                json!(volume),
                json!(volume * close),
                turnover_rate.map(|t| json!(t)).unwrap_or(json!("-")),
            ]
        })
        .collect();
    RawTable::from_columns(
        &["日期", "开盘", "收盘", "最高", "最低", "成交量", "成交额", "换手率"],
        rows,
    )
}

/// 收盘价序列生成的平稳 K 线，开盘等于收盘
pub fn flat_bars(closes: &[f64], volume: f64) -> Vec<Bar> {
    closes.iter().map(|c| (*c, *c, *c, *c, volume)).collect()
}
