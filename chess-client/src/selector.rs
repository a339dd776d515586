//! Backend selection and connectivity state.
//!
//! One selector instance owns the active provider for the lifetime of the
//! application; consumers receive it by injection, never through globals.
//! Switching backends swaps the whole provider instance: the old one is
//! disposed and a fresh game is created against the new one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};
use crate::local::LocalProvider;
use crate::remote::{RemoteProvider, HEALTH_CHECK_TIMEOUT};
use crate::traits::Provider;
use crate::types::{BackendId, CreateGameOptions, GameSnapshot, SelectorSettings};

/// Environment variable naming the default backend.
pub const ENV_DEFAULT_BACKEND: &str = "CHESSMUX_BACKEND";

/// Connectivity of the active backend.
///
/// `Checking` resolves to `Connected` or `Disconnected` after one bounded
/// health-check request; a manual retry re-enters `Checking`. Providers
/// with no network dependency are `Connected` immediately and permanently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unknown,
    Checking,
    Connected,
    Disconnected { reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

pub struct BackendSelector {
    active_id: BackendId,
    provider: Arc<dyn Provider>,
    url_overrides: HashMap<BackendId, String>,
    status_tx: watch::Sender<ConnectionStatus>,
    // Keeps the channel alive even with no external subscribers.
    _status_rx: watch::Receiver<ConnectionStatus>,
}

impl BackendSelector {
    /// Selector on the local backend with no overrides.
    pub fn new() -> Self {
        Self::assemble(
            BackendId::Local,
            Arc::new(LocalProvider::new()),
            HashMap::new(),
        )
    }

    /// Selector restored from persisted settings.
    pub fn from_settings(settings: SelectorSettings) -> ClientResult<Self> {
        let provider = build_provider(settings.active, &settings.url_overrides)?;
        Ok(Self::assemble(
            settings.active,
            provider,
            settings.url_overrides,
        ))
    }

    /// Selector configured from the environment, read once at startup:
    /// `CHESSMUX_BACKEND` plus one URL override variable per remote
    /// backend.
    pub fn from_env() -> ClientResult<Self> {
        let mut settings = SelectorSettings::default();

        if let Ok(value) = std::env::var(ENV_DEFAULT_BACKEND) {
            match value.parse::<BackendId>() {
                Ok(backend) => settings.active = backend,
                Err(e) => warn!(%e, "ignoring invalid default backend"),
            }
        }
        for backend in BackendId::ALL {
            let Some(var) = url_env_var(backend) else {
                continue;
            };
            if let Ok(url) = std::env::var(var) {
                settings.url_overrides.insert(backend, url);
            }
        }

        Self::from_settings(settings)
    }

    /// Selector wrapping an externally constructed provider (tests).
    #[cfg(any(test, feature = "mock"))]
    pub fn with_provider(active: BackendId, provider: Arc<dyn Provider>) -> Self {
        Self::assemble(active, provider, HashMap::new())
    }

    fn assemble(
        active_id: BackendId,
        provider: Arc<dyn Provider>,
        url_overrides: HashMap<BackendId, String>,
    ) -> Self {
        let initial = if active_id.is_remote() {
            ConnectionStatus::Unknown
        } else {
            ConnectionStatus::Connected
        };
        let (status_tx, status_rx) = watch::channel(initial);
        Self {
            active_id,
            provider,
            url_overrides,
            status_tx,
            _status_rx: status_rx,
        }
    }

    pub fn active(&self) -> BackendId {
        self.active_id
    }

    /// Handle to the active provider.
    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.provider)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to connectivity changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Current durable state, for the external persistence collaborator.
    pub fn settings(&self) -> SelectorSettings {
        SelectorSettings {
            active: self.active_id,
            url_overrides: self.url_overrides.clone(),
        }
    }

    /// Set or clear a backend's URL override. Takes effect the next time
    /// that backend is switched to.
    pub fn set_url_override(&mut self, backend: BackendId, url: Option<String>) {
        match url {
            Some(url) => {
                self.url_overrides.insert(backend, url);
            }
            None => {
                self.url_overrides.remove(&backend);
            }
        }
    }

    /// Switch to another backend: dispose the old provider, build a new
    /// one (honoring any URL override), run one bounded health check, and
    /// create a fresh game against it.
    ///
    /// A failing health check leaves the selector `Disconnected` on the
    /// new backend and returns the failure; it never blocks play against
    /// the local backend.
    pub async fn switch(&mut self, backend: BackendId) -> ClientResult<GameSnapshot> {
        info!(from = %self.active_id, to = %backend, "switching backend");

        let replacement = build_provider(backend, &self.url_overrides)?;
        let old = std::mem::replace(&mut self.provider, replacement);
        old.dispose().await;
        self.active_id = backend;

        if let ConnectionStatus::Disconnected { reason } = self.run_health_check().await {
            return Err(ClientError::Network(reason));
        }

        self.provider.create_game(CreateGameOptions::default()).await
    }

    /// Manual retry: `Disconnected -> Checking -> {Connected, Disconnected}`.
    pub async fn retry_health_check(&mut self) -> ConnectionStatus {
        self.run_health_check().await
    }

    async fn run_health_check(&mut self) -> ConnectionStatus {
        if !self.active_id.is_remote() {
            self.set_status(ConnectionStatus::Connected);
            return ConnectionStatus::Connected;
        }

        self.set_status(ConnectionStatus::Checking);
        let outcome =
            tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.provider.health_check()).await;
        let status = match outcome {
            Ok(Ok(())) => ConnectionStatus::Connected,
            Ok(Err(e)) => ConnectionStatus::Disconnected {
                reason: e.to_string(),
            },
            Err(_) => ConnectionStatus::Disconnected {
                reason: "health check timed out".to_string(),
            },
        };

        if let ConnectionStatus::Disconnected { reason } = &status {
            warn!(backend = %self.active_id, %reason, "backend health check failed");
        }
        self.set_status(status.clone());
        status
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::new()
    }
}

fn build_provider(
    backend: BackendId,
    overrides: &HashMap<BackendId, String>,
) -> ClientResult<Arc<dyn Provider>> {
    if !backend.is_remote() {
        return Ok(Arc::new(LocalProvider::new()));
    }

    let url = overrides
        .get(&backend)
        .cloned()
        .or_else(|| backend.default_url().map(String::from))
        .ok_or_else(|| {
            ClientError::InvalidData(format!("no URL configured for backend {backend}"))
        })?;
    Ok(Arc::new(RemoteProvider::new(backend, url)?))
}

fn url_env_var(backend: BackendId) -> Option<&'static str> {
    match backend {
        BackendId::Local => None,
        BackendId::Rust => Some("CHESSMUX_RUST_API_URL"),
        BackendId::Go => Some("CHESSMUX_GO_API_URL"),
        BackendId::Js => Some("CHESSMUX_JS_API_URL"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    #[test]
    fn test_local_selector_connected_immediately() {
        let selector = BackendSelector::new();
        assert_eq!(selector.active(), BackendId::Local);
        assert!(selector.status().is_connected());
    }

    #[tokio::test]
    async fn test_local_health_check_skips_network() {
        let mut selector = BackendSelector::new();
        assert!(selector.retry_health_check().await.is_connected());
    }

    #[tokio::test]
    async fn test_switch_to_local_creates_fresh_game() {
        let mut selector = BackendSelector::new();
        let old_provider = selector.provider();
        for _ in 0..2 {
            old_provider
                .create_game(CreateGameOptions::default())
                .await
                .unwrap();
        }

        let snapshot = selector.switch(BackendId::Local).await.unwrap();
        assert_eq!(snapshot.move_count, 0);
        assert!(selector.status().is_connected());

        // The replacement provider holds only the freshly created game.
        assert!(selector.provider().get_game(&snapshot.id).await.is_ok());
        assert!(selector.provider().get_game("2").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_health_check_disconnects_with_reason() {
        let mock = MockTransport::new().with_network_error("connection refused");
        let provider = Arc::new(
            RemoteProvider::with_transport(BackendId::Rust, "http://x", Arc::new(mock)).unwrap(),
        );
        let mut selector = BackendSelector::with_provider(BackendId::Rust, provider);

        let status = selector.retry_health_check().await;
        assert!(
            matches!(status, ConnectionStatus::Disconnected { ref reason }
                if reason.contains("connection refused")),
            "{status:?}"
        );
        assert_eq!(selector.status(), status);
    }

    #[tokio::test]
    async fn test_retry_recovers_to_connected() {
        let mock = MockTransport::new()
            .with_network_error("connection refused")
            .with_json(200, json!({"status": "ok"}));
        let provider = Arc::new(
            RemoteProvider::with_transport(BackendId::Rust, "http://x", Arc::new(mock)).unwrap(),
        );
        let mut selector = BackendSelector::with_provider(BackendId::Rust, provider);

        assert!(!selector.retry_health_check().await.is_connected());
        assert!(selector.retry_health_check().await.is_connected());
    }

    #[tokio::test]
    async fn test_status_watch_sees_transitions() {
        let mock = MockTransport::new().with_json(200, json!({"ok": true}));
        let provider = Arc::new(
            RemoteProvider::with_transport(BackendId::Js, "http://x", Arc::new(mock)).unwrap(),
        );
        let mut selector = BackendSelector::with_provider(BackendId::Js, provider);

        let mut receiver = selector.watch_status();
        assert_eq!(*receiver.borrow(), ConnectionStatus::Unknown);

        selector.retry_health_check().await;
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_settings_roundtrip_with_overrides() {
        let mut selector = BackendSelector::new();
        selector.set_url_override(BackendId::Go, Some("http://lan:9999".to_string()));

        let settings = selector.settings();
        assert_eq!(settings.active, BackendId::Local);
        assert_eq!(
            settings.url_overrides.get(&BackendId::Go).map(String::as_str),
            Some("http://lan:9999")
        );

        let restored = BackendSelector::from_settings(settings).unwrap();
        assert_eq!(restored.active(), BackendId::Local);

        selector.set_url_override(BackendId::Go, None);
        assert!(selector.settings().url_overrides.is_empty());
    }
}
