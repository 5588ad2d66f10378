//! 防伪标记提取
//!
//! 纯函数，畸形输入只返回 `None`，不会报错。

use once_cell::sync::Lazy;
use regex::Regex;

/// JSON 响应中承载标记的字段（按优先级）
pub const JSON_TOKEN_FIELDS: [&str; 3] = ["token", "antiforgeryToken", "__RequestVerificationToken"];

struct TokenPattern {
    name: &'static str,
    regex: Regex,
}

/// HTML 中嵌入标记的已知方式
///
/// 顺序固定：同一页面可能同时命中多个模式，只取第一个命中的
static HTML_TOKEN_PATTERNS: Lazy<Vec<TokenPattern>> = Lazy::new(|| {
    [
        (
            "hidden-field",
            r#"(?i)name=["']__RequestVerificationToken["']\s+value=["']([^"']+)["']"#,
        ),
        (
            "input-element",
            r#"(?i)<input[^>]*name=["']__RequestVerificationToken["'][^>]*value=["']([^"']+)["']"#,
        ),
        (
            "json-double-quoted",
            r#"(?i)"__RequestVerificationToken":\s*"([^"]+)""#,
        ),
        (
            "window-assignment",
            r#"(?i)window\.antiForgeryToken\s*=\s*["']([^"']+)["']"#,
        ),
        (
            "data-attribute",
            r#"(?i)data-antiforgery-token=["']([^"']+)["']"#,
        ),
        (
            "json-single-quoted",
            r#"(?i)'__RequestVerificationToken':\s*'([^']+)'"#,
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| TokenPattern {
        name,
        regex: Regex::new(pattern).expect("invalid token pattern"),
    })
    .collect()
});

/// 从 HTML 文本中提取防伪标记
pub fn extract_from_html(html: &str) -> Option<String> {
    for pattern in HTML_TOKEN_PATTERNS.iter() {
        let hit = pattern
            .regex
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|value| !value.is_empty());

        if let Some(value) = hit {
            tracing::debug!("[TOKEN] HTML 模式命中: {}", pattern.name);
            return Some(value.to_string());
        }
    }
    None
}

/// 从 JSON 响应体中提取防伪标记
///
/// 非 JSON 或非对象返回 `None`
pub fn extract_from_json(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    JSON_TOKEN_FIELDS.iter().find_map(|field| {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    })
}
