//! 浏览器请求头组合
//!
//! 目标站点会检查导航模式，这里按浏览器真实行为构造各阶段的请求头。

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_ANY: &str = "*/*";

/// 发现的防伪标记会同时挂在以下所有请求头上
pub const TOKEN_HEADER_NAMES: [&str; 4] = [
    "X-CSRF-TOKEN",
    "RequestVerificationToken",
    "X-XSRF-TOKEN",
    "__RequestVerificationToken",
];

const SEC_FETCH_SITE: HeaderName = HeaderName::from_static("sec-fetch-site");
const SEC_FETCH_MODE: HeaderName = HeaderName::from_static("sec-fetch-mode");
const SEC_FETCH_DEST: HeaderName = HeaderName::from_static("sec-fetch-dest");
const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// 浏览器请求头工厂
#[derive(Debug, Clone)]
pub struct BrowserHeaders {
    user_agent: HeaderValue,
    accept_language: HeaderValue,
    entry_referer: HeaderValue,
    /// 同源 Referer，即 `{origin}/`
    origin_referer: HeaderValue,
}

impl BrowserHeaders {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            user_agent: header_value("user-agent", &config.user_agent)?,
            accept_language: header_value("accept-language", &config.accept_language)?,
            entry_referer: header_value("referer", &config.entry_referer)?,
            origin_referer: header_value(
                "referer",
                &format!("{}/", config.origin.trim_end_matches('/')),
            )?,
        })
    }

    /// 首次进站：从外部站点跳转过来的文档导航
    pub fn entry_navigation(&self) -> HeaderMap {
        let mut headers = self.navigation_base();
        headers.insert(REFERER, self.entry_referer.clone());
        headers.insert(SEC_FETCH_SITE, HeaderValue::from_static("cross-site"));
        headers
    }

    /// 同源文档导航，用于稳定 Cookie
    pub fn same_origin_navigation(&self) -> HeaderMap {
        let mut headers = self.navigation_base();
        headers.insert(REFERER, self.origin_referer.clone());
        headers.insert(SEC_FETCH_SITE, HeaderValue::from_static("same-origin"));
        headers
    }

    /// 候选端点探测：同源 AJAX 请求
    pub fn ajax_probe(&self) -> HeaderMap {
        let mut headers = self.same_origin_fetch();
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        headers
    }

    /// 表单提交探测
    pub fn form_submit(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(REFERER, self.origin_referer.clone());
        headers
    }

    /// 停车场 API 请求头
    ///
    /// 目标站点实际检查的标记头名称未知，发现标记时同时写入全部候选名称
    pub fn protected_call(&self, token: Option<&str>) -> Result<HeaderMap, ProxyError> {
        let mut headers = self.same_origin_fetch();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            for name in TOKEN_HEADER_NAMES {
                let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    ProxyError::InvalidHeader {
                        name: name.to_string(),
                    }
                })?;
                headers.insert(header_name, header_value(name, token)?);
            }
        }

        Ok(headers)
    }

    fn navigation_base(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, self.accept_language.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(SEC_FETCH_MODE, HeaderValue::from_static("navigate"));
        headers.insert(SEC_FETCH_DEST, HeaderValue::from_static("document"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers
    }

    fn same_origin_fetch(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_ANY));
        headers.insert(ACCEPT_LANGUAGE, self.accept_language.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(REFERER, self.origin_referer.clone());
        headers.insert(SEC_FETCH_SITE, HeaderValue::from_static("same-origin"));
        headers.insert(SEC_FETCH_MODE, HeaderValue::from_static("cors"));
        headers.insert(SEC_FETCH_DEST, HeaderValue::from_static("empty"));
        headers
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ProxyError> {
    HeaderValue::from_str(value).map_err(|_| ProxyError::InvalidHeader {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> BrowserHeaders {
        let config = UpstreamConfig {
            origin: "https://parking.example.test".to_string(),
            ..UpstreamConfig::default()
        };
        BrowserHeaders::new(&config).unwrap()
    }

    #[test]
    fn test_entry_navigation_is_cross_site() {
        let h = headers().entry_navigation();
        assert_eq!(h["referer"], "https://www.google.com/");
        assert_eq!(h["sec-fetch-site"], "cross-site");
        assert_eq!(h["sec-fetch-mode"], "navigate");
        assert_eq!(h["sec-fetch-dest"], "document");
        assert_eq!(h["upgrade-insecure-requests"], "1");
    }

    #[test]
    fn test_same_origin_navigation_referer() {
        let h = headers().same_origin_navigation();
        assert_eq!(h["referer"], "https://parking.example.test/");
        assert_eq!(h["sec-fetch-site"], "same-origin");
    }

    #[test]
    fn test_ajax_probe_headers() {
        let h = headers().ajax_probe();
        assert_eq!(h["x-requested-with"], "XMLHttpRequest");
        assert_eq!(h["accept"], ACCEPT_ANY);
        assert_eq!(h["sec-fetch-mode"], "cors");
    }

    #[test]
    fn test_protected_call_without_token() {
        let h = headers().protected_call(None).unwrap();
        assert_eq!(h["content-type"], "application/json");
        for name in TOKEN_HEADER_NAMES {
            assert!(h.get(name.to_ascii_lowercase()).is_none());
        }
    }

    #[test]
    fn test_protected_call_shotguns_token() {
        let h = headers().protected_call(Some("tok-123")).unwrap();
        for name in TOKEN_HEADER_NAMES {
            assert_eq!(h[name.to_ascii_lowercase().as_str()], "tok-123");
        }
    }

    #[test]
    fn test_protected_call_rejects_unprintable_token() {
        let err = headers().protected_call(Some("bad\ntoken")).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidHeader { .. }));
    }
}
