//! 代理编排器

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::models::{
    collect_headers, safe_truncate, Diagnostics, ParkingQuery, ProxyMeta, ProxyResult,
    UpstreamFailure, TEXT_PREVIEW_CHARS,
};
use crate::session::{bootstrap_session, Session};
use crate::token::TokenDiscovery;
use crate::upstream::{OutboundRequest, ReqwestTransport, Transport};
use serde_json::Value;
use std::sync::Arc;

/// 停车场代理
///
/// 自身无状态，可在并发请求间共享；每次 `handle` 都新建独立的 `Session`
pub struct ParkingProxy {
    config: UpstreamConfig,
    transport: Arc<dyn Transport>,
}

impl ParkingProxy {
    pub fn new(config: UpstreamConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// 使用 reqwest 传输层创建
    pub fn from_config(config: UpstreamConfig) -> Result<Self, ProxyError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::new(config, transport))
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// 处理一次停车场查询
    ///
    /// 引导与标记发现阶段的错误只进入诊断信息；
    /// 只有最终 API 请求的传输错误（含超时）会以 `Err` 返回
    pub async fn handle(&self, query: &ParkingQuery) -> Result<ProxyResult, ProxyError> {
        tracing::info!(
            "[PARKS] 开始处理停车场查询 lon={} lat={} type={} radius={}",
            query.longitude,
            query.latitude,
            query.vehicle_type,
            query.radius
        );

        let mut session = Session::new(&self.config, self.transport.clone())?;

        let boot = bootstrap_session(&mut session).await;
        let report = TokenDiscovery::new(&self.config)
            .discover(&mut session, &boot.html)
            .await;

        let token = report.token();
        let cookie_header = session.cookie_header();
        let has_cookie = !cookie_header.is_empty();
        let used_token = token.is_some();
        let token_source = token.map(|t| t.source().to_string());

        tracing::info!(
            "[PARKS] 标记状态 has_cookie={} used_token={} token_source={}",
            has_cookie,
            used_token,
            token_source.as_deref().unwrap_or("none")
        );

        let url = session.url(&query.resource_path(&self.config.parks_path))?;
        let headers = session.headers().protected_call(token.map(|t| t.value()))?;

        tracing::info!("[PARKS] 发送请求到: {}", url);
        let response = session
            .execute(OutboundRequest::get(url.clone(), headers))
            .await?;
        tracing::info!(
            "[PARKS] API 回应: {} 内容长度: {}",
            response.status,
            response.body.len()
        );

        if !response.is_success() {
            tracing::warn!(
                "[PARKS] API 失败，状态: {} 回应: {}",
                response.status,
                safe_truncate(&response.body, 500)
            );
            let diagnostics = Diagnostics {
                boot_status: boot.status,
                boot_content_type: boot.content_type,
                stabilize_status: boot.stabilize_status,
                boot_errors: boot.errors,
                cookie_preview: Diagnostics::preview_cookie(&cookie_header),
                html_preview: Diagnostics::preview_html(&boot.html),
                response_headers: collect_headers(&response.headers),
                attempts: report.attempts.clone(),
            };
            return Ok(ProxyResult::Failure(Box::new(UpstreamFailure {
                status: response.status.as_u16(),
                url: url.to_string(),
                has_cookie,
                used_token,
                token_source,
                diagnostics,
                text: safe_truncate(&response.body, TEXT_PREVIEW_CHARS),
            })));
        }

        let data = match serde_json::from_str::<Value>(&response.body) {
            Ok(json) => {
                match json.as_array() {
                    Some(items) => tracing::info!("[PARKS] 成功解析 JSON，项目数: {}", items.len()),
                    None => tracing::info!("[PARKS] 成功解析 JSON"),
                }
                json
            }
            Err(_) => {
                tracing::info!("[PARKS] 回应不是 JSON 格式，原样返回");
                Value::String(response.body)
            }
        };

        Ok(ProxyResult::Success {
            data,
            meta: ProxyMeta {
                token_source,
                has_cookie,
                used_token,
            },
        })
    }
}
