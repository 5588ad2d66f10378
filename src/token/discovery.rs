//! 防伪标记发现
//!
//! 三种策略按固定顺序执行，首个成功即停止：
//! 1. HTML：首页 HTML 提取，失败后提交一次表单再提取
//! 2. 候选端点：逐个 GET 候选路径，先看 Cookie，再看响应体（HTML → JSON）
//! 3. Cookie 兜底：直接在 Jar 中按名称查找
//!
//! 全部失败不视为错误，最终请求会在不带标记的情况下继续。

use super::extractor::{extract_from_html, extract_from_json};
use super::{AttemptLog, AttemptRecord, Discovery, Token, TokenSource};
use crate::config::UpstreamConfig;
use crate::logger::token_preview;
use crate::session::Session;
use crate::upstream::{OutboundRequest, UpstreamResponse};

/// 表单探测提交的占位数据
const FORM_PROBE_BODY: &str = "dummy=1";

/// 标记发现结果
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub discovery: Discovery,
    /// 每次尝试的记录，失败响应中作为诊断信息返回
    pub attempts: AttemptLog,
}

impl DiscoveryReport {
    pub fn token(&self) -> Option<&Token> {
        self.discovery.token()
    }
}

/// 标记发现引擎
pub struct TokenDiscovery<'a> {
    candidates: &'a [String],
    form_probe_path: &'a str,
}

impl<'a> TokenDiscovery<'a> {
    pub fn new(config: &'a UpstreamConfig) -> Self {
        Self {
            candidates: &config.token_candidates,
            form_probe_path: &config.form_probe_path,
        }
    }

    /// 依次执行三种策略
    ///
    /// # 参数
    /// - `session`: 已完成引导的会话
    /// - `boot_html`: 引导阶段保留的首页 HTML
    pub async fn discover(&self, session: &mut Session, boot_html: &str) -> DiscoveryReport {
        let mut attempts = AttemptLog::new();

        let mut discovery = self.html_strategy(session, boot_html, &mut attempts).await;

        if !discovery.is_found() {
            tracing::info!("[TOKEN] HTML 方法失败，尝试候选端点");
            discovery = self.endpoint_strategy(session, &mut attempts).await;
        }

        if !discovery.is_found() {
            tracing::info!("[TOKEN] 端点方法失败，尝试直接从 Cookie 读取");
            discovery = self.cookie_strategy(session, &mut attempts);
        }

        match discovery.token() {
            Some(token) => tracing::info!(
                "[TOKEN] 已获取标记 source={} preview={} at={}",
                token.source(),
                token_preview(token.value()),
                token.discovered_at().to_rfc3339()
            ),
            None => tracing::info!("[TOKEN] 未找到标记，将不带标记继续"),
        }

        DiscoveryReport {
            discovery,
            attempts,
        }
    }

    async fn html_strategy(
        &self,
        session: &mut Session,
        boot_html: &str,
        attempts: &mut AttemptLog,
    ) -> Discovery {
        let mut record = AttemptRecord::new("html");
        if let Some(value) = extract_from_html(boot_html) {
            record.found = true;
            attempts.insert("html".to_string(), record);
            return Discovery::Found(Token::new(value, TokenSource::Html));
        }
        attempts.insert("html".to_string(), record);

        // 部分站点只有在一次状态变更交互后才会下发标记
        let key = format!("form:{}", self.form_probe_path);
        let mut record = AttemptRecord::new(key.clone());
        let url = match session.url(self.form_probe_path) {
            Ok(url) => url,
            Err(e) => {
                record.error = Some(e.to_string());
                attempts.insert(key, record);
                return Discovery::NotFound;
            }
        };

        let request = OutboundRequest::post(url, session.headers().form_submit(), FORM_PROBE_BODY);
        let discovery = match session.execute(request).await {
            Ok(response) => {
                fill_response(&mut record, &response);
                match response
                    .is_success()
                    .then(|| extract_from_html(&response.body))
                    .flatten()
                {
                    Some(value) => {
                        record.found = true;
                        Discovery::Found(Token::new(value, TokenSource::Html))
                    }
                    None => Discovery::NotFound,
                }
            }
            Err(e) => {
                tracing::debug!("[TOKEN] 表单方法失败: {}", e);
                record.error = Some(e.to_string());
                Discovery::NotFound
            }
        };
        attempts.insert(key, record);
        discovery
    }

    async fn endpoint_strategy(&self, session: &mut Session, attempts: &mut AttemptLog) -> Discovery {
        for path in self.candidates {
            tracing::debug!("[PROBE] 尝试标记端点: {}", path);
            let source = TokenSource::Endpoint(path.clone());
            let key = source.to_string();
            let mut record = AttemptRecord::new(key.clone());

            let url = match session.url(path) {
                Ok(url) => url,
                Err(e) => {
                    record.error = Some(e.to_string());
                    attempts.insert(key, record);
                    continue;
                }
            };

            let response = match session
                .execute(OutboundRequest::get(url, session.headers().ajax_probe()))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("[PROBE] 端点 {} 请求失败: {}", path, e);
                    record.error = Some(e.to_string());
                    attempts.insert(key, record);
                    continue;
                }
            };
            fill_response(&mut record, &response);

            // 有的端点只通过 Set-Cookie 下发标记，Cookie 优先于响应体
            let hit = session.read_token_cookie().or_else(|| {
                if response.body.is_empty() {
                    None
                } else {
                    extract_from_html(&response.body).or_else(|| extract_from_json(&response.body))
                }
            });

            record.found = hit.is_some();
            attempts.insert(key, record);

            if let Some(value) = hit {
                return Discovery::Found(Token::new(value, source));
            }
        }
        Discovery::NotFound
    }

    fn cookie_strategy(&self, session: &Session, attempts: &mut AttemptLog) -> Discovery {
        let mut record = AttemptRecord::new("cookie");
        let hit = session.read_token_cookie();
        record.found = hit.is_some();
        attempts.insert("cookie".to_string(), record);

        match hit {
            Some(value) => Discovery::Found(Token::new(value, TokenSource::Cookie)),
            None => Discovery::NotFound,
        }
    }
}

fn fill_response(record: &mut AttemptRecord, response: &UpstreamResponse) {
    record.status = Some(response.status.as_u16());
    record.content_type = response.content_type();
    record.size = response.content_length();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::MockTransport;
    use reqwest::Method;
    use std::sync::Arc;

    fn config() -> UpstreamConfig {
        UpstreamConfig {
            origin: "https://parking.example.test".to_string(),
            ..UpstreamConfig::default()
        }
    }

    async fn run(transport: Arc<MockTransport>, boot_html: &str) -> DiscoveryReport {
        let config = config();
        let mut session = Session::new(&config, transport).unwrap();
        TokenDiscovery::new(&config).discover(&mut session, boot_html).await
    }

    fn source_of(report: &DiscoveryReport) -> Option<String> {
        report.token().map(|t| t.source().to_string())
    }

    #[tokio::test]
    async fn test_html_success_short_circuits() {
        let transport = Arc::new(MockTransport::new());
        let html = r#"<input name="__RequestVerificationToken" value="page-token">"#;

        let report = run(transport.clone(), html).await;

        assert_eq!(report.token().map(|t| t.value()), Some("page-token"));
        assert_eq!(source_of(&report).as_deref(), Some("html"));
        // 不发出任何网络请求
        assert_eq!(transport.call_count(), 0);
        assert_eq!(report.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_form_probe_yields_token() {
        let transport = Arc::new(MockTransport::new().respond(
            Method::POST,
            "/Home/Index",
            200,
            r#"<form><input name="__RequestVerificationToken" value="form-token"></form>"#,
        ));

        let report = run(transport.clone(), "<html></html>").await;

        assert_eq!(report.token().map(|t| t.value()), Some("form-token"));
        assert_eq!(source_of(&report).as_deref(), Some("html"));
        assert_eq!(transport.paths(), vec!["/Home/Index"]);

        let call = &transport.calls()[0];
        assert_eq!(call.body.as_deref(), Some("dummy=1"));
        assert_eq!(call.headers["content-type"], "application/x-www-form-urlencoded");
    }

    #[tokio::test]
    async fn test_form_probe_non_success_is_ignored() {
        let transport = Arc::new(MockTransport::new().respond(
            Method::POST,
            "/Home/Index",
            500,
            r#"<input name="__RequestVerificationToken" value="error-page-token">"#,
        ));

        let report = run(transport.clone(), "").await;

        assert!(report.token().is_none());
        assert_eq!(report.attempts["form:/Home/Index"].status, Some(500));
    }

    #[tokio::test]
    async fn test_form_probe_transport_error_continues() {
        let transport = Arc::new(
            MockTransport::new()
                .fail(Method::POST, "/Home/Index")
                .respond(Method::GET, "/antiforgery/token", 200, r#"{"token":"after-form"}"#),
        );

        let report = run(transport.clone(), "").await;

        let form = &report.attempts["form:/Home/Index"];
        assert!(form.error.is_some());
        assert_eq!(form.status, None);
        assert!(!form.found);
        assert_eq!(report.token().map(|t| t.value()), Some("after-form"));
        assert_eq!(source_of(&report).as_deref(), Some("endpoint:/antiforgery/token"));
        assert_eq!(transport.paths(), vec!["/Home/Index", "/antiforgery/token"]);
    }

    #[tokio::test]
    async fn test_endpoint_json_token() {
        let transport = Arc::new(
            MockTransport::new()
                .respond(Method::GET, "/antiforgery/get", 200, r#"{"antiforgeryToken":"ep-json"}"#),
        );

        let report = run(transport.clone(), "").await;

        assert_eq!(report.token().map(|t| t.value()), Some("ep-json"));
        assert_eq!(source_of(&report).as_deref(), Some("endpoint:/antiforgery/get"));
        // 表单探测 + 前两个候选端点
        assert_eq!(
            transport.paths(),
            vec!["/Home/Index", "/antiforgery/token", "/antiforgery/get"]
        );

        let probe = &transport.calls()[1];
        assert_eq!(probe.headers["x-requested-with"], "XMLHttpRequest");
        assert_eq!(probe.headers["sec-fetch-site"], "same-origin");
    }

    #[tokio::test]
    async fn test_endpoint_cookie_takes_priority_over_body() {
        let transport = Arc::new(MockTransport::new().respond_with_headers(
            Method::GET,
            "/antiforgery/token",
            200,
            &[("set-cookie", "XSRF-TOKEN=from-cookie; Path=/")],
            r#"{"token":"from-body"}"#,
        ));

        let report = run(transport, "").await;

        assert_eq!(report.token().map(|t| t.value()), Some("from-cookie"));
        assert_eq!(source_of(&report).as_deref(), Some("endpoint:/antiforgery/token"));
    }

    #[tokio::test]
    async fn test_failing_candidate_does_not_abort() {
        let transport = Arc::new(
            MockTransport::new()
                .fail(Method::GET, "/antiforgery/token")
                .time_out(Method::GET, "/antiforgery/get")
                .respond(Method::GET, "/api/antiforgery/token", 200, r#"{"token":"third"}"#),
        );

        let report = run(transport, "").await;

        assert_eq!(report.token().map(|t| t.value()), Some("third"));
        let first = &report.attempts["endpoint:/antiforgery/token"];
        assert!(first.error.is_some());
        assert_eq!(first.status, None);
        assert!(report.attempts["endpoint:/antiforgery/get"].error.is_some());
        assert!(report.attempts["endpoint:/api/antiforgery/token"].found);
    }

    #[tokio::test]
    async fn test_all_candidates_fail_falls_to_cookie() {
        let mut transport = MockTransport::new();
        for path in config().token_candidates {
            transport = transport.fail(Method::GET, &path);
        }
        let transport = Arc::new(transport);

        let config = config();
        let mut session = Session::new(&config, transport.clone()).unwrap();
        // 引导阶段留下的 Cookie
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::SET_COOKIE,
            reqwest::header::HeaderValue::from_static("CSRF-TOKEN=jar-token; Path=/"),
        );
        session
            .cookies()
            .record_from_response(session.origin(), &headers);

        let report = TokenDiscovery::new(&config).discover(&mut session, "").await;

        // 候选端点全部请求失败，标记由 Cookie 兜底策略取得
        assert_eq!(report.token().map(|t| t.value()), Some("jar-token"));
        assert_eq!(source_of(&report).as_deref(), Some("cookie"));
        assert_eq!(transport.call_count(), 1 + config.token_candidates.len());

        let keys: Vec<&String> = report.attempts.keys().collect();
        assert_eq!(keys.first().map(|k| k.as_str()), Some("html"));
        assert_eq!(keys.last().map(|k| k.as_str()), Some("cookie"));
    }

    #[tokio::test]
    async fn test_no_token_anywhere() {
        let transport = Arc::new(MockTransport::new());
        let report = run(transport.clone(), "<html>no token</html>").await;

        assert!(!report.discovery.is_found());
        // html + form + 8 个候选端点 + cookie
        assert_eq!(report.attempts.len(), 11);
        assert!(report.attempts.values().all(|r| !r.found));
    }

    #[tokio::test]
    async fn test_discovery_is_deterministic() {
        let build = || {
            Arc::new(
                MockTransport::new()
                    .respond(Method::GET, "/token/csrf", 200, r#"<div data-antiforgery-token="stable"></div>"#)
                    .respond(Method::GET, "/w1/InitToken", 200, r#"{"token":"later"}"#),
            )
        };

        let first = run(build(), "").await;
        let second = run(build(), "").await;

        assert_eq!(first.token().map(|t| t.value()), Some("stable"));
        assert_eq!(
            first.token().map(|t| t.value()),
            second.token().map(|t| t.value())
        );
        assert_eq!(source_of(&first), source_of(&second));
        assert_eq!(source_of(&first).as_deref(), Some("endpoint:/token/csrf"));
    }
}
