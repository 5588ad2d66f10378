//! HTTP API 服务器
//!
//! 对外只暴露一个停车场查询端点（两个路由别名）和健康检查

use crate::config::ServerConfig;
use crate::models::{ParkingQuery, ProxyResult};
use crate::proxy::ParkingProxy;
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const ALLOWED_METHODS: &str = "GET, OPTIONS";

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ParkingProxy>,
}

impl AppState {
    pub fn new(proxy: ParkingProxy) -> Self {
        Self {
            proxy: Arc::new(proxy),
        }
    }
}

/// 构建路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/parks", any(parks_handler))
        // 前端原有调用路径
        .route("/.netlify/functions/parks", any(parks_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// 启动服务器，直到收到关闭信号
pub async fn run_server(
    config: &ServerConfig,
    state: AppState,
    shutdown: oneshot::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_router(state);

    let addr: std::net::SocketAddr = config.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("[SERVER] 正在监听: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
        })
        .await?;

    tracing::info!("[SERVER] 已停止");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn parks_handler(
    State(state): State<AppState>,
    method: Method,
    RawQuery(raw_query): RawQuery,
) -> Response {
    if method == Method::OPTIONS {
        return preflight_response();
    }
    if method != Method::GET {
        return method_not_allowed();
    }

    let query = match ParkingQuery::from_query_string(raw_query.as_deref()) {
        Ok(query) => query,
        Err(e) => {
            tracing::debug!("[SERVER] 查询参数无效: {}", e);
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "ok": false, "error": e.to_string() }),
            );
        }
    };

    match state.proxy.handle(&query).await {
        Ok(result) => proxy_result_response(&result),
        Err(e) => {
            tracing::error!("[SERVER] 代理请求失败: {}", e);
            proxy_failed(&e.to_string())
        }
    }
}

fn proxy_result_response(result: &ProxyResult) -> Response {
    let status = StatusCode::from_u16(result.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    json_response(status, &result.to_json())
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, JSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body.to_string(),
    )
        .into_response()
}

fn proxy_failed(message: &str) -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({ "ok": false, "error": "proxy_failed", "message": message }),
    )
}

fn preflight_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ALLOW, ALLOWED_METHODS),
        ],
        "Method Not Allowed",
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("[SERVER] 处理请求时发生 panic: {}", message);

    proxy_failed(&message)
}
