//! Provider trait abstraction over game backends.

use async_trait::async_trait;
use cozy_chess::Square;
use engine::Tier;

use crate::error::ClientResult;
use crate::types::{
    AiMoveOutcome, BackendId, Capabilities, CreateGameOptions, GameSnapshot, LegalMove,
    RemoteAnalysis,
};

/// One asynchronous contract over every backend variant.
///
/// The local variant resolves immediately; remote variants go over HTTP.
/// Either way each operation returns the canonical [`GameSnapshot`] model,
/// so consumers never branch on the backend kind.
///
/// Callers must check [`Provider::capabilities`] before invoking an
/// optional operation; providers refuse unsupported calls with
/// [`crate::ClientError::Unsupported`] rather than silently ignoring them.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which backend this provider talks to.
    fn backend(&self) -> BackendId;

    /// Static capability flags for this backend.
    fn capabilities(&self) -> Capabilities;

    /// Create a new game, optionally seeded from a FEN.
    async fn create_game(&self, options: CreateGameOptions) -> ClientResult<GameSnapshot>;

    /// Fetch the current state of a game.
    async fn get_game(&self, id: &str) -> ClientResult<GameSnapshot>;

    /// Delete a game and release its resources.
    async fn delete_game(&self, id: &str) -> ClientResult<()>;

    /// Apply a move given in coordinate form ("e2", "e4", promotion piece).
    async fn make_move(
        &self,
        id: &str,
        from: &str,
        to: &str,
        promotion: Option<char>,
    ) -> ClientResult<GameSnapshot>;

    /// Revert the most recent half-move.
    async fn undo_move(&self, id: &str) -> ClientResult<GameSnapshot>;

    /// Legal moves in the current position, optionally from one square.
    async fn legal_moves(&self, id: &str, from: Option<Square>) -> ClientResult<Vec<LegalMove>>;

    /// Have the backend's engine play a move for the side to move.
    async fn ai_move(&self, id: &str, tier: Tier) -> ClientResult<AiMoveOutcome>;

    /// Suggest a move without changing the game.
    async fn ai_hint(&self, id: &str, tier: Tier) -> ClientResult<Option<LegalMove>>;

    /// Replace the game's position from a FEN string.
    async fn load_fen(&self, id: &str, fen: &str) -> ClientResult<GameSnapshot>;

    /// Export the game as PGN text.
    async fn pgn(&self, id: &str) -> ClientResult<String>;

    /// Fetch a position evaluation from the backend's analysis service.
    async fn analysis(&self, id: &str, depth: Option<u8>) -> ClientResult<RemoteAnalysis>;

    /// Cheap connectivity probe; the selector bounds it with a timeout.
    async fn health_check(&self) -> ClientResult<()>;

    /// Release everything this provider holds. Called before the selector
    /// discards the instance on a backend switch.
    async fn dispose(&self);
}
