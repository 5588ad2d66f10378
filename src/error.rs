//! 错误类型定义
//!
//! 只有最终停车场请求的错误会向上传播；
//! 引导请求和标记探测阶段的错误都记录在诊断信息中。

use thiserror::Error;

/// 上游请求错误
#[derive(Debug, Error)]
pub enum ProxyError {
    /// 连接失败、读取响应体失败或重定向次数超限
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// 单次上游请求超时
    #[error("upstream request timed out: {0}")]
    Timeout(String),

    #[error("invalid upstream url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header value for {name}")]
    InvalidHeader { name: String },

    /// HTTP 客户端构建失败
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout(err.to_string())
        } else {
            ProxyError::Transport(err.to_string())
        }
    }
}

impl ProxyError {
    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProxyError::Timeout(_))
    }
}
