//! YAML 配置加载
//!
//! 配置文件路径解析顺序：
//! 1. `PARKCAST_CONFIG` 环境变量
//! 2. `<config_dir>/parkcast/config.yaml`
//!
//! 文件不存在时使用默认配置；文件存在但无法解析时返回错误。

use super::types::Config;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV_VAR: &str = "PARKCAST_CONFIG";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parkcast")
        .join("config.yaml")
}

/// 解析实际使用的配置文件路径
pub fn resolve_config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// 加载配置：读取文件、应用环境变量覆盖并校验
pub fn load_config() -> Result<Config, ConfigError> {
    let path = resolve_config_path();
    let mut config = load_config_from(&path)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// 从指定路径加载配置（不应用环境变量覆盖）
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("[CONFIG] 配置文件不存在，使用默认配置: {}", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("[CONFIG] 已加载配置文件: {}", path.display());
    Ok(config)
}

/// 应用环境变量覆盖
///
/// 支持 `PARKCAST_HOST`、`PARKCAST_PORT`、`PARKCAST_ORIGIN`、`PARKCAST_TIMEOUT_SECS`
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_with(config, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_with<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("PARKCAST_HOST").filter(|v| !v.trim().is_empty()) {
        config.server.host = host.trim().to_string();
    }

    if let Some(port) = lookup("PARKCAST_PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("[CONFIG] 忽略无效的 PARKCAST_PORT: {}", port),
        }
    }

    if let Some(origin) = lookup("PARKCAST_ORIGIN").filter(|v| !v.trim().is_empty()) {
        config.upstream.origin = origin.trim().trim_end_matches('/').to_string();
    }

    if let Some(timeout) = lookup("PARKCAST_TIMEOUT_SECS") {
        match timeout.trim().parse::<u64>() {
            Ok(secs) => config.upstream.request_timeout_secs = secs,
            Err(_) => tracing::warn!("[CONFIG] 忽略无效的 PARKCAST_TIMEOUT_SECS: {}", timeout),
        }
    }
}

impl Config {
    /// 启动前校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.upstream.origin)
            .map_err(|e| ConfigError::Invalid(format!("upstream.origin: {}", e)))?;

        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "upstream.origin must be http or https, got {}",
                origin.scheme()
            )));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(ConfigError::Invalid(
                "upstream.origin must not carry a path or query".to_string(),
            ));
        }

        if self.upstream.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "upstream.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let paths = self
            .upstream
            .token_candidates
            .iter()
            .map(|p| ("upstream.token_candidates", p))
            .chain([
                ("upstream.form_probe_path", &self.upstream.form_probe_path),
                ("upstream.parks_path", &self.upstream.parks_path),
            ]);
        for (field, path) in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "{} must start with '/': {}",
                    field, path
                )));
            }
        }

        // 尝试记录以端点路径为键，重复的候选会覆盖之前的记录
        let mut seen = HashSet::new();
        for path in &self.upstream.token_candidates {
            if !seen.insert(path.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "upstream.token_candidates contains duplicate path: {}",
                    path
                )));
            }
        }

        Ok(())
    }
}
