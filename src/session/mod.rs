//! 会话管理模块
//!
//! 提供以下功能：
//! - 单次入站请求范围内的 Cookie 存储
//! - 自动携带/记录 Cookie 并手动跟随重定向的 `Session`
//! - 模拟浏览器两跳进站的会话引导

mod bootstrap;
mod cookie_store;

pub use bootstrap::{bootstrap_session, BootstrapOutcome};
pub use cookie_store::CookieStore;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::upstream::{BrowserHeaders, OutboundRequest, Transport, UpstreamResponse};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use url::Url;

/// 承载防伪标记的 Cookie 名称（按优先级）
pub const TOKEN_COOKIE_NAMES: [&str; 5] = [
    "XSRF-TOKEN",
    "RequestVerificationToken",
    "__RequestVerificationToken",
    "CSRF-TOKEN",
    "X-CSRF-TOKEN",
];

/// 单次入站请求的上游会话
///
/// 同一入站请求内发往目标站点的所有请求都必须经过同一个 `Session`，
/// 保证 Cookie 单调累积。
pub struct Session {
    origin: Url,
    cookies: CookieStore,
    headers: BrowserHeaders,
    transport: Arc<dyn Transport>,
    max_redirects: usize,
    last_cookie_header: String,
}

impl Session {
    pub fn new(config: &UpstreamConfig, transport: Arc<dyn Transport>) -> Result<Self, ProxyError> {
        Ok(Self {
            origin: Url::parse(&config.origin)?,
            cookies: CookieStore::new(),
            headers: BrowserHeaders::new(config)?,
            transport,
            max_redirects: config.max_redirects,
            last_cookie_header: String::new(),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn headers(&self) -> &BrowserHeaders {
        &self.headers
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    /// 目标站点下的绝对 URL
    pub fn url(&self, path: &str) -> Result<Url, ProxyError> {
        Ok(self.origin.join(path)?)
    }

    /// 刷新并返回当前站点的 Cookie 头
    pub fn cookie_header(&mut self) -> String {
        self.last_cookie_header = self.cookies.cookie_header(&self.origin);
        self.last_cookie_header.clone()
    }

    /// 最近一次读取的 Cookie 头
    pub fn last_cookie_header(&self) -> &str {
        &self.last_cookie_header
    }

    /// 在 Cookie 中查找防伪标记
    pub fn read_token_cookie(&self) -> Option<String> {
        self.cookies.read_named(&self.origin, &TOKEN_COOKIE_NAMES)
    }

    /// 发送请求
    ///
    /// - 自动附带 Jar 中适用的 Cookie
    /// - 每一跳响应的 `Set-Cookie` 都会写入 Jar
    /// - 3xx 响应按 `Location` 手动跟随，301/302/303 上的 POST 改为 GET
    pub async fn execute(
        &mut self,
        request: OutboundRequest,
    ) -> Result<UpstreamResponse, ProxyError> {
        let mut request = request;
        let mut redirects = 0usize;

        loop {
            match self.cookies.header_value(&request.url) {
                Some(value) if !value.is_empty() => {
                    request.headers.insert(COOKIE, value);
                }
                _ => {
                    request.headers.remove(COOKIE);
                }
            }

            let url = request.url.clone();
            let response = self.transport.send(request.clone()).await?;
            let recorded = self.cookies.record_from_response(&url, &response.headers);
            if recorded > 0 {
                tracing::debug!("[SESSION] {} 设置了 {} 个 Cookie", url.path(), recorded);
            }
            self.last_cookie_header = self.cookies.cookie_header(&self.origin);

            let location = match redirect_location(&response) {
                Some(location) => location,
                None => return Ok(response),
            };

            if redirects >= self.max_redirects {
                return Err(ProxyError::Transport(format!(
                    "too many redirects ({}) starting from {}",
                    redirects, url
                )));
            }
            redirects += 1;

            let next = url.join(&location)?;
            tracing::debug!(
                "[SESSION] 跟随重定向 {} -> {} ({})",
                url,
                next,
                response.status
            );

            if rewrites_to_get(response.status, &request.method) {
                request.method = Method::GET;
                request.body = None;
                request.headers.remove(CONTENT_TYPE);
                request.headers.remove(CONTENT_LENGTH);
            }
            request.url = next;
        }
    }
}

fn redirect_location(response: &UpstreamResponse) -> Option<String> {
    if !response.status.is_redirection() {
        return None;
    }
    response
        .headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn rewrites_to_get(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *method != Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        _ => false,
    }
}
