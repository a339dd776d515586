//! Mock HTTP transport for testing remote providers without a network.
//!
//! Only compiled in test mode or with the `mock` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Recording transport: queued canned responses, logged requests.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<ClientResult<HttpResponse>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response with the given status.
    pub fn with_json(self, status: u16, body: Value) -> Self {
        self.push(Ok(HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        }));
        self
    }

    /// Queue a plain-text response with the given status.
    pub fn with_text(self, status: u16, body: &str) -> Self {
        self.push(Ok(HttpResponse {
            status,
            content_type: Some("text/plain".to_string()),
            body: body.to_string(),
        }));
        self
    }

    /// Queue a transport-level failure.
    pub fn with_network_error(self, message: &str) -> Self {
        self.push(Err(ClientError::Network(message.to_string())));
        self
    }

    fn push(&self, response: ClientResult<HttpResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::NotConfigured(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_responses_consumed_in_order() {
        let mock = MockTransport::new()
            .with_json(200, json!({"ok": true}))
            .with_text(404, "gone");

        let first = mock
            .execute(HttpRequest::get("http://x/a".to_string()))
            .await
            .unwrap();
        assert_eq!(first.status, 200);
        assert!(!first.is_text());

        let second = mock
            .execute(HttpRequest::get("http://x/b".to_string()))
            .await
            .unwrap();
        assert_eq!(second.status, 404);
        assert!(second.is_text());

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests()[1].url, "http://x/b");
    }

    #[tokio::test]
    async fn test_exhausted_queue_reports_not_configured() {
        let mock = MockTransport::new();
        let err = mock
            .execute(HttpRequest::get("http://x/c".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConfigured(_)));
    }
}
