//! 热点题材放量筛选服务
//!
//! 从人气榜出发聚合热点题材，获取成员股日K线、计算技术指标并按规则筛选
//! 数据来源：新浪财经、东方财富、腾讯财经

mod config;     // 配置
mod error;      // 错误类型
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::ScreenQuery;
use crate::services::screen::render_table;
use crate::services::stock::HttpMarketData;
use crate::services::stock_service::StockService;

#[derive(Parser)]
#[command(name = "hotscreen")]
#[command(about = "热点题材放量筛选", long_about = None)]
struct Cli {
    /// 配置文件路径，缺省时依次查找 config.json、config/config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 HTTP 服务（默认）
    Serve,
    /// 执行一次筛选并输出结果
    Screen {
        /// 参与统计的人气榜个股数量
        #[arg(long)]
        top_hot: Option<usize>,
        /// 选择的热点题材数量
        #[arg(long)]
        themes: Option<usize>,
        /// 每个题材挑选的个股数量
        #[arg(long)]
        theme_members: Option<usize>,
        /// 以 JSON 输出完整报告
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(p) => AppConfig::from_file(p),
        None => Ok(AppConfig::load()),
    }
}

/// 应用程序入口
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    let provider = Arc::new(HttpMarketData::from_config(&config.provider)?);
    let service = StockService::new(provider, &config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, service).await,
        Commands::Screen {
            top_hot,
            themes,
            theme_members,
            json,
        } => {
            let params = service.screen_params(&ScreenQuery {
                top_hot,
                themes,
                theme_members,
            });
            let report = service.run_screen(params).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_table(&report));
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, service: StockService) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr();
    log::info!("启动热点题材筛选服务，监听 {}", bind_addr);

    let service = web::Data::new(service);
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 添加请求日志中间件
            .app_data(service.clone())
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(bind_addr)?.run().await?;
    Ok(())
}
