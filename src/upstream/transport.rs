//! 上游传输层

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{redirect, Client, Method, StatusCode};
use url::Url;

/// 一次出站请求
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn get(url: Url, headers: HeaderMap) -> Self {
        Self {
            method: Method::GET,
            url,
            headers,
            body: None,
        }
    }

    pub fn post(url: Url, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url,
            headers,
            body: Some(body.into()),
        }
    }
}

/// 已完整读取的上游响应
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<String> {
        self.header_str(CONTENT_TYPE.as_str())
    }

    pub fn content_length(&self) -> Option<String> {
        self.header_str(CONTENT_LENGTH.as_str())
    }

    fn header_str(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

/// 出站请求发送器
///
/// 实现方只负责发送单个请求并读取完整响应体，
/// Cookie 累积与重定向由 `Session` 处理。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError>;
}

/// 基于 reqwest 的传输实现
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 创建传输层
    ///
    /// 关闭 reqwest 自带的重定向跟随，每个请求都受 `request_timeout_secs` 限制
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::none())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
