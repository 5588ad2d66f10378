//! Cookie 存储
//!
//! 包装 reqwest 的 `Jar`，域名/路径作用域由 Jar 处理。
//! 每个入站请求独享一个实例，请求结束即丢弃。

use reqwest::cookie::{CookieStore as _, Jar};
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use url::Url;

/// 单个会话的 Cookie 存储
#[derive(Debug, Default)]
pub struct CookieStore {
    jar: Jar,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把响应中的 `Set-Cookie` 合并进 Jar
    ///
    /// # 返回
    /// 本次响应携带的 `Set-Cookie` 条数
    pub fn record_from_response(&self, url: &Url, headers: &HeaderMap) -> usize {
        let count = headers.get_all(SET_COOKIE).iter().count();
        if count > 0 {
            let mut iter = headers.get_all(SET_COOKIE).iter();
            self.jar.set_cookies(&mut iter, url);
        }
        count
    }

    /// 适用于指定 URL 的原始 `Cookie` 头，值可能含非 ASCII 字节
    pub fn header_value(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }

    /// 适用于指定 URL 的 `name=value; ...` 字符串，没有 Cookie 时返回空字符串
    pub fn cookie_header(&self, url: &Url) -> String {
        self.header_value(url)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default()
    }

    /// 按候选名称优先级查找 Cookie 值
    ///
    /// 每个候选名称先精确匹配，再做不区分大小写的包含匹配；值为空的 Cookie 跳过
    pub fn read_named<S: AsRef<str>>(&self, url: &Url, candidates: &[S]) -> Option<String> {
        let header = self.cookie_header(url);
        let pairs = parse_cookie_pairs(&header);

        for candidate in candidates {
            let candidate = candidate.as_ref();
            let needle = candidate.to_lowercase();
            let hit = pairs
                .iter()
                .find(|(name, value)| !value.is_empty() && *name == candidate)
                .or_else(|| {
                    pairs.iter().find(|(name, value)| {
                        !value.is_empty() && name.to_lowercase().contains(&needle)
                    })
                });
            if let Some((name, value)) = hit {
                tracing::debug!("[COOKIE] 命中标记 Cookie: {} (候选 {})", name, candidate);
                return Some(value.to_string());
            }
        }
        None
    }

    /// 出站请求使用的 Jar
    pub fn jar(&self) -> &Jar {
        &self.jar
    }
}

/// 解析 `a=1; b=2` 形式的 Cookie 头
fn parse_cookie_pairs(header: &str) -> Vec<(&str, &str)> {
    header
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.split_once('=') {
                Some((name, value)) => Some((name.trim(), value.trim())),
                None => Some((part, "")),
            }
        })
        .collect()
}
