//! 上游 HTTP 访问模块
//!
//! - `Transport`：单次请求发送抽象（不处理 Cookie 与重定向）
//! - `ReqwestTransport`：基于 reqwest 的实现
//! - `BrowserHeaders`：模拟浏览器导航/AJAX 的请求头组合

mod headers;
#[cfg(test)]
pub(crate) mod mock;
mod transport;

pub use headers::{BrowserHeaders, ACCEPT_ANY, ACCEPT_HTML, TOKEN_HEADER_NAMES};
pub use transport::{OutboundRequest, ReqwestTransport, Transport, UpstreamResponse};
