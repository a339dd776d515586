//! HTTP transport abstraction for remote providers.
//!
//! The remote provider talks through [`HttpTransport`] instead of calling
//! reqwest directly, so tests can substitute a recording mock and assert
//! on the exact requests issued (including that none were).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// One outgoing request. Bodies are always JSON when present.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    /// Per-request deadline; `None` means no client-side bound.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: String) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: String, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            url,
            body,
            timeout: None,
        }
    }

    pub fn delete(url: String) -> Self {
        Self {
            method: Method::Delete,
            url,
            body: None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A raw response: status, declared content type, and the body as text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server declared a plain-text payload (PGN export, bare
    /// error strings).
    pub fn is_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("text/"))
            .unwrap_or(false)
    }

    pub fn json(&self) -> ClientResult<Value> {
        serde_json::from_str(&self.body)
            .map_err(|e| ClientError::InvalidData(format!("malformed JSON body: {e}")))
    }
}

/// Minimal async HTTP client surface used by remote providers.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> ClientResult<HttpResponse>;
}

/// Production transport over reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
