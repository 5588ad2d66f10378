//! 会话引导
//!
//! 按浏览器的两跳进站模式访问目标站点：
//! 1. 从外部站点跳转进入首页（cross-site 文档导航）
//! 2. 同源再次访问首页，稳定 Cookie
//!
//! 第一跳的 HTML 会保留下来交给标记发现使用，不再重复请求。

use super::Session;
use crate::upstream::OutboundRequest;

/// 引导结果
#[derive(Debug, Clone, Default)]
pub struct BootstrapOutcome {
    /// 第一跳状态码
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// 第一跳 HTML
    pub html: String,
    /// 第二跳状态码
    pub stabilize_status: Option<u16>,
    /// 引导过程中的传输错误
    pub errors: Vec<String>,
}

/// 执行两跳引导
///
/// 传输错误只记录不传播，后续流程按"无结果"继续
pub async fn bootstrap_session(session: &mut Session) -> BootstrapOutcome {
    let mut outcome = BootstrapOutcome::default();

    let entry_url = session.origin().clone();
    let entry = OutboundRequest::get(entry_url, session.headers().entry_navigation());
    match session.execute(entry).await {
        Ok(response) => {
            outcome.status = Some(response.status.as_u16());
            outcome.content_type = response.content_type();
            outcome.html = response.body;
            tracing::info!(
                "[BOOT] 首页状态: {} 内容长度: {}",
                response.status,
                outcome.html.len()
            );
        }
        Err(e) => {
            tracing::warn!("[BOOT] 首页请求失败: {}", e);
            outcome.errors.push(format!("entry: {}", e));
        }
    }

    match session.url("/") {
        Ok(stabilize_url) => {
            let stabilize =
                OutboundRequest::get(stabilize_url, session.headers().same_origin_navigation());
            match session.execute(stabilize).await {
                Ok(response) => {
                    outcome.stabilize_status = Some(response.status.as_u16());
                    tracing::debug!("[BOOT] 同源稳定请求状态: {}", response.status);
                }
                Err(e) => {
                    tracing::warn!("[BOOT] 同源稳定请求失败: {}", e);
                    outcome.errors.push(format!("stabilize: {}", e));
                }
            }
        }
        Err(e) => outcome.errors.push(format!("stabilize: {}", e)),
    }

    let has_cookie = !session.cookie_header().is_empty();
    tracing::info!(
        "[BOOT] Cookie 状态: {}",
        if has_cookie { "有Cookie" } else { "无Cookie" }
    );

    outcome
}
