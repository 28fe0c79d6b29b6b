//! 股票数据服务模块
//!
//! 提供股票相关的数据服务，支持多种数据源：
//! - 新浪财经：全量日线、实时行情
//! - 东方财富：区间日线、人气榜、题材关键词、全市场快照
//! - 腾讯财经：备用区间日线

pub mod common;
pub mod eastmoney;
pub mod history;
pub mod http;
pub mod normalize;
pub mod provider;
pub mod sina;
pub mod tencent;

#[cfg(test)]
pub mod mock;

// 重新导出常用类型，保持对外接口一致
pub use common::Symbol;
pub use history::HistoryFetcher;
pub use http::HttpMarketData;
pub use provider::{MarketDataProvider, ProviderCall, RawTable};
