//! 对外响应结构
//!
//! 成功：`{ ok: true, data, meta }`
//! 上游失败：`{ ok: false, status, url, hasCookie, usedToken, tokenSource?, diagnostics, text }`

use super::safe_truncate;
use crate::token::AttemptLog;
use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;

pub const COOKIE_PREVIEW_CHARS: usize = 200;
pub const HTML_PREVIEW_CHARS: usize = 400;
pub const TEXT_PREVIEW_CHARS: usize = 1000;

/// 最终请求实际使用的会话/标记状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_source: Option<String>,
    pub has_cookie: bool,
    pub used_token: bool,
}

/// 诊断信息，只在失败响应中返回
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub boot_status: Option<u16>,
    pub boot_content_type: Option<String>,
    pub stabilize_status: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub boot_errors: Vec<String>,
    /// Cookie 头预览（最多 200 字符）
    pub cookie_preview: String,
    /// 首页 HTML 预览（最多 400 字符）
    pub html_preview: String,
    /// 失败响应的全部响应头
    pub response_headers: IndexMap<String, String>,
    /// 标记获取的尝试记录
    pub attempts: AttemptLog,
}

impl Diagnostics {
    pub fn preview_cookie(cookie_header: &str) -> String {
        safe_truncate(cookie_header, COOKIE_PREVIEW_CHARS)
    }

    pub fn preview_html(html: &str) -> String {
        safe_truncate(html, HTML_PREVIEW_CHARS)
    }
}

/// 上游拒绝时的失败结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    pub status: u16,
    pub url: String,
    pub has_cookie: bool,
    pub used_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_source: Option<String>,
    pub diagnostics: Diagnostics,
    /// 响应体前 1000 字符
    pub text: String,
}

/// 代理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyResult {
    Success { data: Value, meta: ProxyMeta },
    Failure(Box<UpstreamFailure>),
}

/// 带 `ok` 字段的响应外壳
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub inner: T,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    data: &'a Value,
    meta: &'a ProxyMeta,
}

impl ProxyResult {
    /// 对外 HTTP 状态码：成功为 200，失败沿用上游状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyResult::Success { .. } => 200,
            ProxyResult::Failure(failure) => failure.status,
        }
    }

    /// 对外 JSON 响应体
    pub fn to_json(&self) -> Value {
        let body = match self {
            ProxyResult::Success { data, meta } => serde_json::to_value(Envelope {
                ok: true,
                inner: SuccessBody { data, meta },
            }),
            ProxyResult::Failure(failure) => serde_json::to_value(Envelope {
                ok: false,
                inner: &**failure,
            }),
        };
        body.unwrap_or_else(|e| {
            serde_json::json!({ "ok": false, "error": "proxy_failed", "message": e.to_string() })
        })
    }
}

/// 收集响应头，重复的头用 ", " 连接
pub fn collect_headers(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut collected = IndexMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        collected.insert(name.as_str().to_string(), joined);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_success_body_shape() {
        let result = ProxyResult::Success {
            data: json!([{"id": "P1"}]),
            meta: ProxyMeta {
                token_source: Some("cookie".to_string()),
                has_cookie: true,
                used_token: true,
            },
        };
        assert_eq!(result.status_code(), 200);
        assert_eq!(
            result.to_json(),
            json!({
                "ok": true,
                "data": [{"id": "P1"}],
                "meta": {"tokenSource": "cookie", "hasCookie": true, "usedToken": true}
            })
        );
    }

    #[test]
    fn test_meta_omits_token_source_when_unused() {
        let meta = ProxyMeta {
            token_source: None,
            has_cookie: false,
            used_token: false,
        };
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"hasCookie": false, "usedToken": false})
        );
    }

    #[test]
    fn test_failure_body_shape() {
        let result = ProxyResult::Failure(Box::new(UpstreamFailure {
            status: 403,
            url: "https://parking.example.test/w1/GetParks/1/2/car/5".to_string(),
            has_cookie: true,
            used_token: false,
            token_source: None,
            diagnostics: Diagnostics {
                boot_status: Some(200),
                cookie_preview: "sid=1".to_string(),
                ..Diagnostics::default()
            },
            text: "forbidden".to_string(),
        }));
        assert_eq!(result.status_code(), 403);

        let body = result.to_json();
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["status"], json!(403));
        assert_eq!(body["hasCookie"], json!(true));
        assert_eq!(body["usedToken"], json!(false));
        assert!(body.get("tokenSource").is_none());
        assert_eq!(body["diagnostics"]["bootStatus"], json!(200));
        assert_eq!(body["diagnostics"]["cookiePreview"], json!("sid=1"));
        assert!(body["diagnostics"].get("bootErrors").is_none());
        assert_eq!(body["text"], json!("forbidden"));
    }

    #[test]
    fn test_previews_are_bounded() {
        let html = "x".repeat(5000);
        assert_eq!(Diagnostics::preview_html(&html).chars().count(), 400);
        assert_eq!(Diagnostics::preview_cookie(&html).chars().count(), 200);
    }

    #[test]
    fn test_collect_headers_joins_duplicates() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("content-type", HeaderValue::from_static("text/html"));

        let collected = collect_headers(&headers);
        assert_eq!(collected["set-cookie"], "a=1, b=2");
        assert_eq!(collected["content-type"], "text/html");
        assert_eq!(collected.len(), 2);
    }
}
