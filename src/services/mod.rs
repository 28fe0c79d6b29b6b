//! 业务逻辑服务模块
//!
//! 封装数据获取和处理逻辑

pub mod cache;          // 全市场快照缓存
pub mod indicators;     // 技术指标
pub mod pacing;         // 请求节流
pub mod retry;          // 重试与退避
pub mod screen;         // 热点题材筛选
pub mod stock;          // 股票数据源
pub mod stock_service;  // 股票数据服务
