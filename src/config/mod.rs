//! 配置管理模块
//!
//! 提供 YAML 配置文件加载、环境变量覆盖和启动前校验

mod types;
mod yaml;

pub use types::{
    Config, LoggingConfig, ServerConfig, UpstreamConfig, DEFAULT_ORIGIN, DEFAULT_TOKEN_CANDIDATES,
};
pub use yaml::{
    apply_env_overrides, default_config_path, load_config, load_config_from, resolve_config_path,
    ConfigError, CONFIG_ENV_VAR,
};
