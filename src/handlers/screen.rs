//! 筛选接口处理器
//!
//! - GET /screen/hot-volume - 热点题材放量筛选

use actix_web::{web, HttpResponse, Result};

use super::error_response;
use crate::models::{ApiResponse, ScreenQuery, ScreenReport};
use crate::services::stock_service::StockService;

/// 热点题材放量筛选
///
/// GET /api/v1/screen/hot-volume?top_hot=60&themes=3&theme_members=3
///
/// 单只股票失败不影响整体结果，只有人气榜获取失败才返回错误
pub async fn hot_volume_screen(
    service: web::Data<StockService>,
    query: web::Query<ScreenQuery>,
) -> Result<HttpResponse> {
    let params = service.screen_params(&query);
    log::info!(
        "开始筛选: 人气榜前 {} / 题材 {} / 每题材 {} 只",
        params.top_hot,
        params.themes,
        params.theme_members
    );

    match service.run_screen(params).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => Ok(error_response::<ScreenReport>(&e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/screen").route("/hot-volume", web::get().to(hot_volume_screen)));
}
