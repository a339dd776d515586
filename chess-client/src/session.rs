//! Turn-taking orchestration over a selected provider.
//!
//! The session keeps a local rules-engine mirror of the game alongside the
//! provider's canonical state. Moves are applied to the mirror first
//! (optimistically, before the provider confirms) and the artificial
//! opponent always searches against the mirror, even under a remote
//! provider, then commits its move through the provider for consistency.

use std::time::{Duration, Instant};

use chess::{Game, PieceColor};
use chess_common::{format_piece_lower, format_square, parse_piece, parse_square};
use engine::Tier;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::selector::BackendSelector;
use crate::types::{BackendId, CreateGameOptions, GameSnapshot, LegalMove};

/// Configuration of the artificial opponent for one session.
#[derive(Debug, Clone, Copy)]
pub struct AiOpponent {
    pub color: PieceColor,
    pub tier: Tier,
}

/// Minimum wall-clock time the artificial opponent appears to think, so an
/// instant reply does not feel robotic. Cancellable, never a blocking sleep.
const DEFAULT_THINK_DELAY: Duration = Duration::from_millis(600);

pub struct GameSession {
    selector: BackendSelector,
    game_id: String,
    snapshot: GameSnapshot,
    mirror: Game,
    ai: Option<AiOpponent>,
    think_delay: Duration,
    // Bumped whenever the game context is replaced; a pending AI think
    // from an older generation is discarded instead of committed.
    generation: u64,
}

impl GameSession {
    /// Start a session with a fresh game against the selector's active
    /// provider.
    pub async fn new(selector: BackendSelector, ai: Option<AiOpponent>) -> ClientResult<Self> {
        let options = create_options(ai.as_ref(), None);
        let snapshot = selector.provider().create_game(options).await?;
        let mirror = mirror_from(&snapshot)?;
        Ok(Self {
            game_id: snapshot.id.clone(),
            snapshot,
            mirror,
            selector,
            ai,
            think_delay: DEFAULT_THINK_DELAY,
            generation: 0,
        })
    }

    pub fn with_think_delay(mut self, delay: Duration) -> Self {
        self.think_delay = delay;
        self
    }

    pub fn snapshot(&self) -> &GameSnapshot {
        &self.snapshot
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut BackendSelector {
        &mut self.selector
    }

    /// FEN of the local mirror (the optimistic view of the game).
    pub fn mirror_fen(&self) -> String {
        self.mirror.to_fen()
    }

    /// Whether the artificial opponent is due to move.
    pub fn is_ai_turn(&self) -> bool {
        self.ai
            .as_ref()
            .is_some_and(|ai| !self.snapshot.game_over && ai.color == self.snapshot.turn)
    }

    /// Play a human move given in coordinate form.
    ///
    /// The move is validated and applied to the local mirror before the
    /// provider round-trip. If the provider then rejects it, the mirror is
    /// deliberately left ahead (no rollback); the divergence is logged and
    /// the error surfaced so the caller can [`GameSession::refresh`].
    pub async fn play_move(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<char>,
    ) -> ClientResult<&GameSnapshot> {
        let illegal = || ClientError::IllegalMove {
            from: from.to_string(),
            to: to.to_string(),
        };
        let from_square = parse_square(from).ok_or_else(illegal)?;
        let to_square = parse_square(to).ok_or_else(illegal)?;
        let promotion_piece = match promotion {
            Some(c) => Some(parse_piece(c).ok_or_else(illegal)?),
            None => None,
        };

        let mv = self
            .mirror
            .find_legal_move(from_square, to_square, promotion_piece)
            .ok_or_else(illegal)?;
        self.commit_move(mv).await
    }

    /// Let the artificial opponent take its turn, if it is due.
    ///
    /// Searches the local mirror, waits out the remaining think delay, then
    /// commits through the provider. Returns `Ok(None)` when there is
    /// nothing to do: no AI opponent, not its turn, game over, or the
    /// session context changed while thinking (the stale move is
    /// discarded).
    pub async fn take_ai_turn(&mut self) -> ClientResult<Option<&GameSnapshot>> {
        let Some(ai) = self.ai else {
            return Ok(None);
        };
        if self.snapshot.game_over || PieceColor::from(self.mirror.side_to_move()) != ai.color {
            return Ok(None);
        }

        let generation = self.generation;
        let started = Instant::now();
        let chosen = engine::compute_best_move(&mut self.mirror, ai.tier);

        let elapsed = started.elapsed();
        if elapsed < self.think_delay {
            tokio::time::sleep(self.think_delay - elapsed).await;
        }
        if generation != self.generation {
            debug!("discarding AI move computed for a superseded game");
            return Ok(None);
        }

        match chosen {
            Some(mv) => self.commit_move(mv).await.map(Some),
            // Terminal position: no move available.
            None => Ok(None),
        }
    }

    /// Suggest a move for the side to move: the backend's hint service
    /// when available, otherwise a local search on the mirror.
    pub async fn hint(&mut self) -> ClientResult<Option<LegalMove>> {
        let tier = self.ai.map(|ai| ai.tier).unwrap_or(Tier::Medium);
        let provider = self.selector.provider();
        if provider.capabilities().hint {
            provider.ai_hint(&self.game_id, tier).await
        } else {
            Ok(engine::compute_best_move(&mut self.mirror, tier).map(|mv| LegalMove {
                from: format_square(mv.from),
                to: format_square(mv.to),
                promotion: mv.promotion.map(Into::into),
            }))
        }
    }

    /// Undo the last move. Against an AI opponent this reverts the AI's
    /// reply as well, so the human is to move again.
    pub async fn undo(&mut self) -> ClientResult<&GameSnapshot> {
        self.generation += 1;
        let provider = self.selector.provider();

        let plies = if self.ai.is_some() && self.snapshot.move_count >= 2 {
            2
        } else {
            1
        };
        let mut snapshot = provider.undo_move(&self.game_id).await?;
        for _ in 1..plies {
            snapshot = provider.undo_move(&self.game_id).await?;
        }

        self.adopt(snapshot)
    }

    /// Abandon the current game and create a fresh one, optionally from a
    /// FEN. A pending AI think for the old game is superseded.
    pub async fn new_game(&mut self, fen: Option<String>) -> ClientResult<&GameSnapshot> {
        self.generation += 1;
        let provider = self.selector.provider();

        if let Err(e) = provider.delete_game(&self.game_id).await {
            debug!(%e, "old game cleanup failed");
        }
        let snapshot = provider
            .create_game(create_options(self.ai.as_ref(), fen))
            .await?;
        self.game_id = snapshot.id.clone();
        self.adopt(snapshot)
    }

    /// Switch backends: the selector swaps providers and creates a fresh
    /// game; the session adopts it and supersedes any pending AI think.
    pub async fn switch_backend(&mut self, backend: BackendId) -> ClientResult<&GameSnapshot> {
        self.generation += 1;
        let snapshot = self.selector.switch(backend).await?;
        self.game_id = snapshot.id.clone();
        self.adopt(snapshot)
    }

    /// Re-fetch the provider's state and rebuild the mirror from it; the
    /// recovery path after an optimistic update diverged.
    pub async fn refresh(&mut self) -> ClientResult<&GameSnapshot> {
        self.generation += 1;
        let snapshot = self.selector.provider().get_game(&self.game_id).await?;
        self.adopt(snapshot)
    }

    /// Apply a mirror-validated move optimistically, then commit it
    /// through the provider.
    async fn commit_move(&mut self, mv: cozy_chess::Move) -> ClientResult<&GameSnapshot> {
        let from = format_square(mv.from);
        let to = format_square(mv.to);
        let promotion = mv.promotion.map(format_piece_lower);

        self.mirror.make_move(mv).map_err(|_| ClientError::IllegalMove {
            from: from.clone(),
            to: to.clone(),
        })?;

        match self
            .selector
            .provider()
            .make_move(&self.game_id, &from, &to, promotion)
            .await
        {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                Ok(&self.snapshot)
            }
            Err(e) => {
                warn!(
                    %e,
                    mirror_fen = %self.mirror.to_fen(),
                    provider_fen = %self.snapshot.fen,
                    "provider rejected an optimistically applied move; mirror left ahead"
                );
                Err(e)
            }
        }
    }

    fn adopt(&mut self, snapshot: GameSnapshot) -> ClientResult<&GameSnapshot> {
        self.mirror = mirror_from(&snapshot)?;
        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }
}

fn create_options(ai: Option<&AiOpponent>, fen: Option<String>) -> CreateGameOptions {
    CreateGameOptions {
        fen,
        ai_enabled: ai.is_some(),
        ai_difficulty: ai.map(|ai| ai.tier),
        ai_color: ai.map(|ai| ai.color),
        ..Default::default()
    }
}

fn mirror_from(snapshot: &GameSnapshot) -> ClientResult<Game> {
    Game::from_fen(&snapshot.fen).map_err(|e| ClientError::InvalidFen(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::remote::RemoteProvider;
    use crate::types::BackendId;
    use serde_json::json;
    use std::sync::Arc;

    async fn local_session(ai: Option<AiOpponent>) -> GameSession {
        GameSession::new(BackendSelector::new(), ai)
            .await
            .unwrap()
            .with_think_delay(Duration::ZERO)
    }

    fn black_ai(tier: Tier) -> Option<AiOpponent> {
        Some(AiOpponent {
            color: PieceColor::Black,
            tier,
        })
    }

    #[tokio::test]
    async fn test_human_then_ai_turn() {
        let mut session = local_session(black_ai(Tier::Easy)).await;
        assert!(!session.is_ai_turn());

        session.play_move("e2", "e4", None).await.unwrap();
        assert!(session.is_ai_turn());

        let snapshot = session.take_ai_turn().await.unwrap().unwrap();
        assert_eq!(snapshot.move_count, 2);
        assert_eq!(snapshot.turn, PieceColor::White);
        assert!(!session.is_ai_turn());
    }

    #[tokio::test]
    async fn test_ai_turn_noop_when_not_due() {
        let mut session = local_session(black_ai(Tier::Easy)).await;
        // White (human) to move.
        assert!(session.take_ai_turn().await.unwrap().is_none());

        let mut session = local_session(None).await;
        session.play_move("e2", "e4", None).await.unwrap();
        assert!(session.take_ai_turn().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_illegal_human_move_leaves_state_alone() {
        let mut session = local_session(None).await;
        assert!(session.play_move("e2", "e5", None).await.is_err());
        assert!(session.play_move("x9", "e4", None).await.is_err());
        assert_eq!(session.snapshot().move_count, 0);
        assert_eq!(session.mirror_fen(), session.snapshot().fen);
    }

    #[tokio::test]
    async fn test_undo_against_ai_reverts_both_plies() {
        let mut session = local_session(black_ai(Tier::Harmless)).await;
        session.play_move("e2", "e4", None).await.unwrap();
        session.take_ai_turn().await.unwrap().unwrap();
        assert_eq!(session.snapshot().move_count, 2);

        let snapshot = session.undo().await.unwrap();
        assert_eq!(snapshot.move_count, 0);
        assert_eq!(snapshot.turn, PieceColor::White);
    }

    #[tokio::test]
    async fn test_new_game_resets_and_supersedes() {
        let mut session = local_session(black_ai(Tier::Easy)).await;
        session.play_move("e2", "e4", None).await.unwrap();
        let old_generation = session.generation;

        let snapshot = session.new_game(None).await.unwrap();
        assert_eq!(snapshot.move_count, 0);
        assert!(session.generation > old_generation);
        assert_eq!(session.mirror_fen(), session.snapshot().fen);
    }

    #[tokio::test]
    async fn test_dropped_think_commits_nothing() {
        let mut session = local_session(black_ai(Tier::Easy)).await;
        session.play_move("e2", "e4", None).await.unwrap();

        // Cancel mid think-delay: the future is dropped at the sleep and
        // nothing may have been committed.
        session.think_delay = Duration::from_secs(30);
        tokio::select! {
            _ = session.take_ai_turn() => panic!("think should not finish"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
        assert_eq!(session.snapshot().move_count, 1);

        // The session is still usable afterwards.
        session.think_delay = Duration::ZERO;
        assert!(session.take_ai_turn().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_optimistic_update_survives_remote_failure() {
        let game = json!({
            "id": "g1",
            "fen": chess::STARTING_FEN,
            "turn": "white",
            "status": "active",
        });
        let mock = MockTransport::new()
            .with_json(201, game)
            .with_network_error("connection reset");
        let provider = Arc::new(
            RemoteProvider::with_transport(BackendId::Rust, "http://x", Arc::new(mock.clone()))
                .unwrap(),
        );
        let selector = BackendSelector::with_provider(BackendId::Rust, provider);
        let mut session = GameSession::new(selector, None)
            .await
            .unwrap()
            .with_think_delay(Duration::ZERO);

        let err = session.play_move("e2", "e4", None).await.unwrap_err();
        assert!(err.is_connectivity());

        // No rollback: the mirror is a move ahead of the provider state.
        assert_ne!(session.mirror_fen(), session.snapshot().fen);
        assert_eq!(session.snapshot().move_count, 0);
    }

    #[tokio::test]
    async fn test_hint_falls_back_to_local_search() {
        // Local provider supports hints; force the fallback path with a
        // remote provider whose backend lacks the capability.
        let game = json!({
            "gameId": "g1",
            "fen": chess::STARTING_FEN,
            "currentTurn": "w",
            "status": "in_progress",
        });
        let mock = MockTransport::new().with_json(201, game);
        let provider = Arc::new(
            RemoteProvider::with_transport(BackendId::Go, "http://x", Arc::new(mock.clone()))
                .unwrap(),
        );
        let selector = BackendSelector::with_provider(BackendId::Go, provider);
        let mut session = GameSession::new(selector, None).await.unwrap();

        let requests_before = mock.request_count();
        let hint = session.hint().await.unwrap();
        assert!(hint.is_some());
        // The hint came from the mirror, not the network.
        assert_eq!(mock.request_count(), requests_before);
    }

    #[tokio::test]
    async fn test_switch_backend_to_local() {
        let mut session = local_session(None).await;
        session.play_move("e2", "e4", None).await.unwrap();

        let snapshot = session.switch_backend(BackendId::Local).await.unwrap();
        assert_eq!(snapshot.move_count, 0);
        assert_eq!(session.selector().active(), BackendId::Local);
        assert!(session.selector().status().is_connected());
    }
}
