//! 测试用传输层：按 (方法, 路径) 返回预设响应并记录所有出站请求

use super::transport::{OutboundRequest, Transport, UpstreamResponse};
use crate::error::ProxyError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },
    Fail(ProxyErrorKind),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ProxyErrorKind {
    Transport,
    Timeout,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Method, String), MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, method: Method, path: &str, reply: MockReply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), reply);
        self
    }

    pub fn respond(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.respond_with_headers(method, path, status, &[], body)
    }

    pub fn respond_with_headers(
        self,
        method: Method,
        path: &str,
        status: u16,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Self {
        self.reply(
            method,
            path,
            MockReply::Respond {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.to_string(),
            },
        )
    }

    pub fn fail(self, method: Method, path: &str) -> Self {
        self.reply(method, path, MockReply::Fail(ProxyErrorKind::Transport))
    }

    pub fn time_out(self, method: Method, path: &str) -> Self {
        self.reply(method, path, MockReply::Fail(ProxyErrorKind::Timeout))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 已请求的路径（按顺序）
    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: path.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });

        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method.clone(), path.clone()))
            .cloned();

        match reply {
            Some(MockReply::Respond {
                status,
                headers,
                body,
            }) => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.append(
                        HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        HeaderValue::from_bytes(value.as_bytes()).unwrap(),
                    );
                }
                Ok(UpstreamResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: map,
                    body,
                })
            }
            Some(MockReply::Fail(ProxyErrorKind::Transport)) => Err(ProxyError::Transport(
                format!("connection refused: {}", path),
            )),
            Some(MockReply::Fail(ProxyErrorKind::Timeout)) => {
                Err(ProxyError::Timeout(format!("deadline elapsed: {}", path)))
            }
            None => Ok(UpstreamResponse {
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: String::new(),
            }),
        }
    }
}
