//! 数据模型
//!
//! - `parking`：入站查询参数
//! - `response`：对外 JSON 响应结构与诊断信息

pub mod parking;
pub mod response;

pub use parking::{ParkingQuery, QueryError, DEFAULT_RADIUS, DEFAULT_VEHICLE_TYPE};
pub use response::{
    collect_headers, Diagnostics, Envelope, ProxyMeta, ProxyResult, UpstreamFailure,
    COOKIE_PREVIEW_CHARS, HTML_PREVIEW_CHARS, TEXT_PREVIEW_CHARS,
};

/// 安全截断字符串到指定字符数，避免 UTF-8 边界问题
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
