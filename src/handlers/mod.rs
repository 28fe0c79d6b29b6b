pub mod health;
pub mod screen;
pub mod stock;

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::MarketDataError;
use crate::models::ApiResponse;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(stock::config)
            .configure(screen::config)
    );
}

/// 领域错误转换为统一错误响应
///
/// 无效代码 400，无数据 404，其余 500
pub(crate) fn error_response<T: Serialize>(err: &MarketDataError) -> HttpResponse {
    let response = ApiResponse::<T>::error(err.to_string());
    match err {
        MarketDataError::InvalidSymbol(_) => HttpResponse::BadRequest().json(response),
        MarketDataError::NoData { .. } => HttpResponse::NotFound().json(response),
        _ => {
            log::error!("请求处理失败: {}", err);
            HttpResponse::InternalServerError().json(response)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use actix_web::web;
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::error::ProviderError;
    use crate::services::stock::mock::ScriptedProvider;
    use crate::services::stock::{ProviderCall, RawTable};
    use crate::services::stock_service::StockService;

    /// 以脚本化数据源构建服务，重试一次且不等待
    pub fn service<F>(handler: F) -> web::Data<StockService>
    where
        F: Fn(&ProviderCall) -> Result<Option<RawTable>, ProviderError> + Send + Sync + 'static,
    {
        let mut config = AppConfig::default();
        config.provider.retry.max_attempts = 1;
        config.provider.retry.base_delay_ms = 0;
        web::Data::new(StockService::new(
            Arc::new(ScriptedProvider::new(handler)),
            &config,
        ))
    }
}
