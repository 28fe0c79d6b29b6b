//! 股票接口处理器
//!
//! ## API 列表
//! - GET /stocks/hot - 个股人气榜
//! - GET /stocks/{symbol} - 实时行情
//! - GET /stocks/{symbol}/history - 日K线（多数据源回退）
//! - GET /stocks/{symbol}/indicators - 技术指标

use actix_web::{web, HttpResponse, Result};

use super::error_response;
use crate::models::{
    ApiResponse, HistoryQuery, HistoryResult, HotRankQuery, HotStock, IndicatorQuery, IndicatorSet,
    StockQuote,
};
use crate::services::stock_service::StockService;

/// 获取实时行情
///
/// GET /api/v1/stocks/{symbol}
///
/// # 参数
/// - symbol: 股票代码（如 600000、sz000001）
pub async fn get_stock_quote(
    service: web::Data<StockService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner();

    match service.get_quote(&symbol).await {
        Ok(quote) => Ok(HttpResponse::Ok().json(ApiResponse::success(quote))),
        Err(e) => Ok(error_response::<StockQuote>(&e)),
    }
}

/// 获取日K线
///
/// GET /api/v1/stocks/{symbol}/history?months=3&extended=true
pub async fn get_stock_history(
    service: web::Data<StockService>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner();

    match service.get_history(&symbol, &query).await {
        Ok(history) => Ok(HttpResponse::Ok().json(ApiResponse::success(history))),
        Err(e) => Ok(error_response::<HistoryResult>(&e)),
    }
}

/// 获取技术指标
///
/// GET /api/v1/stocks/{symbol}/indicators?months=3
pub async fn get_stock_indicators(
    service: web::Data<StockService>,
    path: web::Path<String>,
    query: web::Query<IndicatorQuery>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner();

    match service.get_indicators(&symbol, &query).await {
        Ok(set) => Ok(HttpResponse::Ok().json(ApiResponse::success(set))),
        Err(e) => Ok(error_response::<IndicatorSet>(&e)),
    }
}

/// 获取个股人气榜
///
/// GET /api/v1/stocks/hot?limit=20
pub async fn get_hot_rank(
    service: web::Data<StockService>,
    query: web::Query<HotRankQuery>,
) -> Result<HttpResponse> {
    match service.get_hot_rank(&query).await {
        Ok(stocks) => Ok(HttpResponse::Ok().json(ApiResponse::success(stocks))),
        Err(e) => Ok(error_response::<Vec<HotStock>>(&e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stocks")
            .route("/hot", web::get().to(get_hot_rank))
            .route("/{symbol}", web::get().to(get_stock_quote))
            .route("/{symbol}/history", web::get().to(get_stock_history))
            .route("/{symbol}/indicators", web::get().to(get_stock_indicators))
    );
}
