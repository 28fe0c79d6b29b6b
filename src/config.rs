//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，所有字段都有默认值

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::services::stock::common::MAX_LOOKBACK_MONTHS;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 重试策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 最大尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 基础延迟（毫秒）
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// 最大延迟（毫秒）
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// 上游数据源配置
///
/// 启动时构建一次 HTTP 客户端，之后所有数据源调用共享，
/// 不修改进程级代理环境变量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 是否使用系统代理
    #[serde(default)]
    pub use_proxy: bool,
    /// 请求头 User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// 同一数据源两次请求之间的最小间隔（毫秒）
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// 重试策略
    #[serde(default)]
    pub retry: RetryConfig,
}

/// 热点题材筛选配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// 参与统计的人气榜个股数量
    #[serde(default = "default_top_hot")]
    pub top_hot: usize,
    /// 选择的热点题材数量
    #[serde(default = "default_themes")]
    pub themes: usize,
    /// 每个题材挑选的个股数量
    #[serde(default = "default_theme_members")]
    pub theme_members: usize,
    /// 历史数据回看月数
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// 是否允许扩大回看窗口到 6 个月
    #[serde(default = "default_true")]
    pub allow_extended: bool,
    /// 换手率阈值（百分比）
    #[serde(default = "default_min_turnover_pct")]
    pub min_turnover_pct: f64,
    /// 成交量放大倍数
    #[serde(default = "default_volume_ratio")]
    pub volume_ratio: f64,
    /// 并发评估数量（1 表示严格串行）
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// 全市场快照缓存时间（秒）
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 数据源配置
    #[serde(default)]
    pub provider: ProviderConfig,
    /// 筛选配置
    #[serde(default)]
    pub screen: ScreenConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 15 }
fn default_connect_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_pacing_ms() -> u64 { 300 }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 1500 }
fn default_max_delay_ms() -> u64 { 30_000 }
fn default_top_hot() -> usize { 60 }
fn default_themes() -> usize { 3 }
fn default_theme_members() -> usize { 3 }
fn default_lookback_months() -> u32 { 3 }
fn default_true() -> bool { true }
fn default_min_turnover_pct() -> f64 { 5.0 }
fn default_volume_ratio() -> f64 { 1.5 }
fn default_concurrency() -> usize { 1 }
fn default_snapshot_ttl() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            use_proxy: false,
            user_agent: default_user_agent(),
            pacing_ms: default_pacing_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            top_hot: default_top_hot(),
            themes: default_themes(),
            theme_members: default_theme_members(),
            lookback_months: default_lookback_months(),
            allow_extended: true,
            min_turnover_pct: default_min_turnover_pct(),
            volume_ratio: default_volume_ratio(),
            concurrency: default_concurrency(),
            snapshot_ttl_secs: default_snapshot_ttl(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProviderConfig {
    /// 构建共享的 HTTP 客户端
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .user_agent(self.user_agent.clone())
            .gzip(true);
        if !self.use_proxy {
            builder = builder.no_proxy();
        }
        Ok(builder.build()?)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;
        config.screen.lookback_months = config.screen.lookback_months.clamp(1, MAX_LOOKBACK_MONTHS);
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        log::info!("从 {} 加载配置成功", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        log::info!("使用默认配置");
        Self::default()
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
