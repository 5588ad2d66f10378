//! 日志系统
//!
//! `RUST_LOG` 优先，否则使用配置中的日志级别

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统
///
/// 重复调用是安全的，只有第一次生效
pub fn init_logger(config: &LoggingConfig) {
    let filter_layer = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| EnvFilter::try_new(&config.level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_level(true);

    let result = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .try_init();

    if result.is_ok() {
        tracing::info!("[LOGGER] 日志系统已初始化 (level={})", config.level);
    }
}

/// 令牌预览：只保留前 20 个字符
pub fn token_preview(token: &str) -> String {
    format!("{}...", crate::models::safe_truncate(token, 20))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("abc"), "abc...");
        assert_eq!(
            token_preview("0123456789abcdefghijXYZ"),
            "0123456789abcdefghij..."
        );
    }

    #[test]
    fn test_init_logger_twice() {
        let config = LoggingConfig::default();
        init_logger(&config);
        init_logger(&config);
    }
}
