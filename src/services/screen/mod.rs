//! 热点题材放量筛选
//!
//! - theme: 人气股题材聚合与候选选择
//! - turnover: 换手率与名称查询（快照缓存）
//! - rules: 四条筛选规则
//! - engine: 批量评估与报告

pub mod engine;
pub mod rules;
pub mod theme;
pub mod turnover;

pub use engine::{render_table, ScreenEngine};
