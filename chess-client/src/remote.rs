//! Network provider for remote chess backends.
//!
//! One HTTP request per contract method, with the response decoded through
//! the backend's adapter. Capability-gated operations are refused on the
//! client side before any request is issued.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chess_common::format_square;
use cozy_chess::Square;
use engine::Tier;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::adapters::{adapter_for, BackendAdapter};
use crate::error::{ClientError, ClientResult};
use crate::traits::Provider;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{
    AiMoveOutcome, BackendId, Capabilities, CreateGameOptions, GameSnapshot, LegalMove,
    RemoteAnalysis,
};

/// Bound on connectivity probes so a dead backend cannot hold the
/// selector in its checking state indefinitely.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Error envelope a backend may answer with: either nested
/// `{"error": {"code", "message"}}` or flat `{"error", "message"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: ErrorDetail },
    Flat {
        error: String,
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct RemoteProvider {
    backend: BackendId,
    base_url: String,
    adapter: Box<dyn BackendAdapter>,
    transport: Arc<dyn HttpTransport>,
}

impl RemoteProvider {
    /// Provider over the production HTTP transport.
    pub fn new(backend: BackendId, base_url: impl Into<String>) -> ClientResult<Self> {
        Self::with_transport(backend, base_url, Arc::new(ReqwestTransport::new()))
    }

    /// Provider over an injected transport (used by tests).
    pub fn with_transport(
        backend: BackendId,
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> ClientResult<Self> {
        let adapter = adapter_for(backend).ok_or_else(|| {
            ClientError::InvalidData(format!("backend {backend} has no remote adapter"))
        })?;
        Ok(Self {
            backend,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            adapter,
            transport,
        })
    }

    fn games_url(&self) -> String {
        format!("{}{}/games", self.base_url, self.adapter.api_prefix())
    }

    fn game_url(&self, id: &str, suffix: &str) -> String {
        format!(
            "{}{}/games/{}{}",
            self.base_url,
            self.adapter.api_prefix(),
            id,
            suffix
        )
    }

    fn require(&self, supported: bool, operation: &'static str) -> ClientResult<()> {
        if supported {
            Ok(())
        } else {
            Err(ClientError::Unsupported {
                backend: self.backend.as_str(),
                operation,
            })
        }
    }

    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        debug!(
            backend = %self.backend,
            method = request.method.as_str(),
            url = %request.url,
            "remote request"
        );
        let response = self.transport.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(decode_error(&response))
        }
    }

    async fn send_json(&self, request: HttpRequest) -> ClientResult<Value> {
        self.send(request).await?.json()
    }

    /// 404 on a game-scoped resource means the id has no backing session.
    fn scope_to_game(error: ClientError, id: &str) -> ClientError {
        match error {
            ClientError::Api { status: 404, .. } => ClientError::GameNotFound(id.to_string()),
            other => other,
        }
    }
}

/// Extract the backend's error shape from a non-2xx response. Plain-text
/// bodies are taken verbatim as the message.
fn decode_error(response: &HttpResponse) -> ClientError {
    let fallback_code = format!("http_{}", response.status);

    if response.is_text() {
        return ClientError::Api {
            status: response.status,
            code: fallback_code,
            message: response.body.trim().to_string(),
        };
    }

    match serde_json::from_str::<ErrorBody>(&response.body) {
        Ok(ErrorBody::Nested { error }) => ClientError::Api {
            status: response.status,
            code: if error.code.is_empty() {
                fallback_code
            } else {
                error.code
            },
            message: error.message,
        },
        Ok(ErrorBody::Flat { error, message }) => ClientError::Api {
            status: response.status,
            code: error,
            message,
        },
        Err(_) => ClientError::Api {
            status: response.status,
            code: fallback_code,
            message: response.body.trim().to_string(),
        },
    }
}

#[async_trait]
impl Provider for RemoteProvider {
    fn backend(&self) -> BackendId {
        self.backend
    }

    fn capabilities(&self) -> Capabilities {
        self.adapter.capabilities()
    }

    async fn create_game(&self, options: CreateGameOptions) -> ClientResult<GameSnapshot> {
        let body = self.adapter.create_game_body(&options);
        let raw = self
            .send_json(HttpRequest::post(self.games_url(), Some(body)))
            .await?;
        self.adapter.norm_game(&raw)
    }

    async fn get_game(&self, id: &str) -> ClientResult<GameSnapshot> {
        let raw = self
            .send_json(HttpRequest::get(self.game_url(id, "")))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        self.adapter.norm_game(&raw)
    }

    async fn delete_game(&self, id: &str) -> ClientResult<()> {
        self.send(HttpRequest::delete(self.game_url(id, "")))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        Ok(())
    }

    async fn make_move(
        &self,
        id: &str,
        from: &str,
        to: &str,
        promotion: Option<char>,
    ) -> ClientResult<GameSnapshot> {
        let mut body = json!({ "from": from, "to": to });
        if let Some(promotion) = promotion {
            body["promotion"] = Value::from(promotion.to_string());
        }
        let raw = self
            .send_json(HttpRequest::post(self.game_url(id, "/moves"), Some(body)))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        self.adapter.norm_game(&raw)
    }

    async fn undo_move(&self, id: &str) -> ClientResult<GameSnapshot> {
        // Client-side guard: no request is issued for a backend without undo.
        self.require(self.capabilities().undo, "undo")?;
        let raw = self
            .send_json(HttpRequest::post(self.game_url(id, "/undo"), None))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        self.adapter.norm_game(&raw)
    }

    async fn legal_moves(&self, id: &str, from: Option<Square>) -> ClientResult<Vec<LegalMove>> {
        let suffix = match from {
            Some(square) => format!("/legal-moves?from={}", format_square(square)),
            None => "/legal-moves".to_string(),
        };
        let raw = self
            .send_json(HttpRequest::get(self.game_url(id, &suffix)))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        Ok(self.adapter.norm_legal_moves(&raw))
    }

    async fn ai_move(&self, id: &str, tier: Tier) -> ClientResult<AiMoveOutcome> {
        self.require(self.capabilities().ai, "ai move")?;
        let body = json!({ (self.adapter.difficulty_field()): tier.as_str() });
        let raw = self
            .send_json(HttpRequest::post(self.game_url(id, "/ai-move"), Some(body)))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        self.adapter.norm_ai_move(&raw, tier)
    }

    async fn ai_hint(&self, id: &str, tier: Tier) -> ClientResult<Option<LegalMove>> {
        self.require(self.capabilities().hint, "hint")?;
        let body = json!({ (self.adapter.difficulty_field()): tier.as_str() });
        let raw = self
            .send_json(HttpRequest::post(self.game_url(id, "/ai-hint"), Some(body)))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        Ok(self.adapter.norm_hint(&raw))
    }

    async fn load_fen(&self, id: &str, fen: &str) -> ClientResult<GameSnapshot> {
        self.require(self.capabilities().fen_load, "FEN load")?;
        let raw = self
            .send_json(HttpRequest::post(
                self.game_url(id, "/fen"),
                Some(json!({ "fen": fen })),
            ))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        self.adapter.norm_game(&raw)
    }

    async fn pgn(&self, id: &str) -> ClientResult<String> {
        self.require(self.capabilities().pgn, "PGN export")?;
        // text/plain payload: no JSON decoding.
        let response = self
            .send(HttpRequest::get(self.game_url(id, "/pgn")))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        Ok(response.body)
    }

    async fn analysis(&self, id: &str, depth: Option<u8>) -> ClientResult<RemoteAnalysis> {
        self.require(self.capabilities().analysis, "analysis")?;
        let suffix = match depth {
            Some(depth) => format!("/analysis?depth={depth}"),
            None => "/analysis".to_string(),
        };
        let raw = self
            .send_json(HttpRequest::get(self.game_url(id, &suffix)))
            .await
            .map_err(|e| Self::scope_to_game(e, id))?;
        Ok(self.adapter.norm_analysis(&raw))
    }

    async fn health_check(&self) -> ClientResult<()> {
        let url = format!("{}{}", self.base_url, self.adapter.health_path());
        self.send(HttpRequest::get(url).with_timeout(HEALTH_CHECK_TIMEOUT))
            .await?;
        Ok(())
    }

    async fn dispose(&self) {
        debug!(backend = %self.backend, "disposed remote provider");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;

    fn rust_game_payload() -> Value {
        json!({
            "id": "g1",
            "fen": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "turn": "white",
            "status": "active",
            "in_check": false,
            "history": [],
        })
    }

    fn provider(backend: BackendId, mock: &MockTransport) -> RemoteProvider {
        RemoteProvider::with_transport(backend, "http://chess.test", Arc::new(mock.clone()))
            .unwrap()
    }

    #[test]
    fn test_local_backend_has_no_remote_adapter() {
        assert!(RemoteProvider::new(BackendId::Local, "http://x").is_err());
    }

    #[tokio::test]
    async fn test_create_game_posts_to_prefixed_path() {
        let mock = MockTransport::new().with_json(201, rust_game_payload());
        let provider = provider(BackendId::Rust, &mock);

        let snapshot = provider
            .create_game(CreateGameOptions {
                ai_enabled: true,
                ai_difficulty: Some(Tier::Hard),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(snapshot.id, "g1");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "http://chess.test/api/games");
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["ai_difficulty"], "hard");
    }

    #[tokio::test]
    async fn test_make_move_body_and_path() {
        let mock = MockTransport::new().with_json(200, rust_game_payload());
        let provider = provider(BackendId::Rust, &mock);

        provider
            .make_move("g1", "e7", "e8", Some('q'))
            .await
            .unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.url, "http://chess.test/api/games/g1/moves");
        let body = request.body.as_ref().unwrap();
        assert_eq!(body["from"], "e7");
        assert_eq!(body["to"], "e8");
        assert_eq!(body["promotion"], "q");
    }

    #[tokio::test]
    async fn test_undo_guard_issues_no_request() {
        // The Go backend has no undo; the guard must fire before transport.
        let mock = MockTransport::new();
        let provider = provider(BackendId::Go, &mock);

        let err = provider.undo_move("g1").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Unsupported {
                backend: "go",
                operation: "undo"
            }
        ));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_hint_guard_issues_no_request() {
        let mock = MockTransport::new();
        let provider = provider(BackendId::Go, &mock);
        assert!(provider.ai_hint("g1", Tier::Easy).await.is_err());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_ai_move_uses_backend_difficulty_field() {
        let go_game = json!({
            "game": {"gameId": "g2", "fen": "x", "currentTurn": "b", "status": "in_progress"},
            "move": "e2e4",
            "thinkingTimeMs": 12,
        });
        let mock = MockTransport::new().with_json(200, go_game);
        let provider = provider(BackendId::Go, &mock);

        let outcome = provider.ai_move("g2", Tier::Godlike).await.unwrap();
        assert_eq!(outcome.mv.unwrap().from, "e2");

        let request = &mock.requests()[0];
        assert_eq!(request.url, "http://chess.test/api/v1/games/g2/ai-move");
        assert_eq!(request.body.as_ref().unwrap()["aiDifficulty"], "godlike");
    }

    #[tokio::test]
    async fn test_nested_error_shape() {
        let mock = MockTransport::new().with_json(
            422,
            json!({"error": {"code": "illegal_move", "message": "e2e5 is not legal"}}),
        );
        let provider = provider(BackendId::Rust, &mock);

        let err = provider.make_move("g1", "e2", "e5", None).await.unwrap_err();
        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 422);
                assert_eq!(code, "illegal_move");
                assert_eq!(message, "e2e5 is not legal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flat_error_shape() {
        let mock = MockTransport::new()
            .with_json(400, json!({"error": "bad_request", "message": "missing fen"}));
        let provider = provider(BackendId::Js, &mock);

        let err = provider.get_game("g1").await.unwrap_err();
        assert!(
            matches!(err, ClientError::Api { ref code, .. } if code == "bad_request"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_text_error_body_is_verbatim_message() {
        let mock = MockTransport::new().with_text(500, "engine exploded\n");
        let provider = provider(BackendId::Rust, &mock);

        let err = provider.get_game("g1").await.unwrap_err();
        assert!(
            matches!(err, ClientError::Api { ref message, .. } if message == "engine exploded"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_404_maps_to_game_not_found() {
        let mock = MockTransport::new().with_json(404, json!({"error": "not_found"}));
        let provider = provider(BackendId::Rust, &mock);

        let err = provider.get_game("gone").await.unwrap_err();
        assert!(matches!(err, ClientError::GameNotFound(ref id) if id == "gone"));
    }

    #[tokio::test]
    async fn test_pgn_text_passthrough() {
        let mock = MockTransport::new().with_text(200, "1. e4 e5 2. Nf3 *");
        let provider = provider(BackendId::Rust, &mock);

        let pgn = provider.pgn("g1").await.unwrap();
        assert_eq!(pgn, "1. e4 e5 2. Nf3 *");
        assert_eq!(mock.requests()[0].url, "http://chess.test/api/games/g1/pgn");
    }

    #[tokio::test]
    async fn test_analysis_guard_and_query() {
        // Js declares no analysis service.
        let mock = MockTransport::new();
        let js = provider(BackendId::Js, &mock);
        assert!(js.analysis("g1", None).await.is_err());
        assert_eq!(mock.request_count(), 0);

        let mock = MockTransport::new().with_json(200, json!({"depth": 6, "score_cp": 15}));
        let rust = provider(BackendId::Rust, &mock);
        let analysis = rust.analysis("g1", Some(6)).await.unwrap();
        assert_eq!(analysis.depth, Some(6));
        assert_eq!(
            mock.requests()[0].url,
            "http://chess.test/api/games/g1/analysis?depth=6"
        );
    }

    #[tokio::test]
    async fn test_health_check_bounded_and_routed() {
        let mock = MockTransport::new().with_json(200, json!({"status": "ok"}));
        let provider = provider(BackendId::Js, &mock);
        provider.health_check().await.unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.url, "http://chess.test/health");
        assert_eq!(request.timeout, Some(HEALTH_CHECK_TIMEOUT));
    }

    #[tokio::test]
    async fn test_network_error_propagates() {
        let mock = MockTransport::new().with_network_error("connection refused");
        let provider = provider(BackendId::Rust, &mock);
        let err = provider.health_check().await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_legal_moves_query_param() {
        let mock = MockTransport::new().with_json(200, json!({"moves": []}));
        let provider = provider(BackendId::Rust, &mock);
        let from = chess_common::parse_square("e2").unwrap();
        provider.legal_moves("g1", Some(from)).await.unwrap();
        assert_eq!(
            mock.requests()[0].url,
            "http://chess.test/api/games/g1/legal-moves?from=e2"
        );
    }
}
