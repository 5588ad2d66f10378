//! 配置类型定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认目标站点
pub const DEFAULT_ORIGIN: &str = "https://itaipeiparking.pma.gov.taipei";

/// 默认的防伪标记候选端点（按优先级排列）
pub const DEFAULT_TOKEN_CANDIDATES: [&str; 8] = [
    "/antiforgery/token",
    "/antiforgery/get",
    "/api/antiforgery/token",
    "/Home/GetAntiForgeryToken",
    "/api/token/antiforgery",
    "/token/csrf",
    "/Home/AntiForgeryToken",
    "/w1/InitToken",
];

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 服务器配置
    pub server: ServerConfig,
    /// 上游站点配置
    pub upstream: UpstreamConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 上游站点配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// 目标站点（不带路径）
    pub origin: String,
    /// 停车场查询路径前缀，后接 `/{lon}/{lat}/{type}/{radius}`
    pub parks_path: String,
    /// 表单提交探测路径
    pub form_probe_path: String,
    /// 防伪标记候选端点，按顺序尝试
    pub token_candidates: Vec<String>,
    /// 首次进站时使用的外部 Referer
    pub entry_referer: String,
    pub user_agent: String,
    pub accept_language: String,
    /// 单次上游请求超时（秒）
    pub request_timeout_secs: u64,
    /// 连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 单次请求最多跟随的重定向次数
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            parks_path: "/w1/GetParks".to_string(),
            form_probe_path: "/Home/Index".to_string(),
            token_candidates: DEFAULT_TOKEN_CANDIDATES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            entry_referer: "https://www.google.com/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) ParkingRadar/1.0".to_string(),
            accept_language: "zh-TW,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6".to_string(),
            request_timeout_secs: 8,
            connect_timeout_secs: 5,
            max_redirects: 20,
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 默认日志级别（RUST_LOG 优先）
    pub level: String,
    /// 是否输出 target
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}
