//! 防伪标记模块
//!
//! - `extractor`：从 HTML / JSON 文本中提取标记（纯函数）
//! - `discovery`：按固定优先级串联 HTML、候选端点、Cookie 三种获取策略

mod discovery;
mod extractor;

pub use discovery::{DiscoveryReport, TokenDiscovery};
pub use extractor::{extract_from_html, extract_from_json, JSON_TOKEN_FIELDS};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// 标记来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// 首页 HTML 或表单提交响应
    Html,
    /// Cookie 兜底
    Cookie,
    /// 候选端点，携带端点路径
    Endpoint(String),
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::Cookie => write!(f, "cookie"),
            Self::Endpoint(path) => write!(f, "endpoint:{}", path),
        }
    }
}

impl Serialize for TokenSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 已发现的防伪标记
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    value: String,
    source: TokenSource,
    discovered_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, source: TokenSource) -> Self {
        Self {
            value: value.into(),
            source,
            discovered_at: Utc::now(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }
}

/// 单个策略的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    Found(Token),
    NotFound,
}

impl Discovery {
    pub fn is_found(&self) -> bool {
        matches!(self, Discovery::Found(_))
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            Discovery::Found(token) => Some(token),
            Discovery::NotFound => None,
        }
    }

    pub fn into_token(self) -> Option<Token> {
        match self {
            Discovery::Found(token) => Some(token),
            Discovery::NotFound => None,
        }
    }
}

/// 单次获取尝试的记录
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    /// 策略标识
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub found: bool,
}

impl AttemptRecord {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }
}

/// 按尝试顺序排列的记录（只追加）
pub type AttemptLog = IndexMap<String, AttemptRecord>;
