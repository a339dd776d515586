//! In-process provider backed directly by the rules engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use chess::{Game, GameError, HistoryEntry};
use chess_common::{format_square, parse_piece, parse_square};
use cozy_chess::{File, Rank, Square};
use engine::Tier;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::traits::Provider;
use crate::types::{
    AiMoveOutcome, BackendId, BoardGrid, BoardPiece, Capabilities, CreateGameOptions,
    GameSnapshot, LegalMove, MoveRecord, RemoteAnalysis,
};

const LOCAL_CAPABILITIES: Capabilities = Capabilities {
    undo: true,
    ai: true,
    hint: true,
    analysis: false,
    chat: false,
    websocket: false,
    pgn: false,
    fen_load: true,
};

/// Provider that owns rules-engine instances directly. Every operation
/// resolves without I/O.
///
/// Each game sits behind its own mutex, so access stays serialized even if
/// the provider is shared across threads; the search's transient
/// mutate-and-revert exploration runs entirely under that lock.
pub struct LocalProvider {
    games: Mutex<HashMap<String, Arc<Mutex<Game>>>>,
    next_id: AtomicU64,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn game(&self, id: &str) -> ClientResult<Arc<Mutex<Game>>> {
        self.games
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::GameNotFound(id.to_string()))
    }

    fn snapshot(id: &str, game: &Game) -> GameSnapshot {
        let status = game.status();
        let turn = game.side_to_move().into();
        GameSnapshot {
            id: id.to_string(),
            fen: game.to_fen(),
            turn,
            status,
            check: game.is_in_check(),
            move_count: game.move_count(),
            history: game.history().iter().map(move_record).collect(),
            board: Some(Box::new(board_grid(game))),
            result: status.result_for_turn(turn),
            game_over: status.is_terminal(),
        }
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn board_grid(game: &Game) -> BoardGrid {
    let mut grid: BoardGrid = Default::default();
    for (rank_idx, rank) in Rank::ALL.into_iter().enumerate() {
        for (file_idx, file) in File::ALL.into_iter().enumerate() {
            grid[rank_idx][file_idx] =
                game.piece_at(Square::new(file, rank))
                    .map(|(piece, color)| BoardPiece {
                        kind: piece.into(),
                        color: color.into(),
                    });
        }
    }
    grid
}

fn move_record(entry: &HistoryEntry) -> MoveRecord {
    MoveRecord {
        from: format_square(entry.from),
        to: format_square(entry.to),
        piece: Some(BoardPiece {
            kind: entry.piece.into(),
            color: entry.piece_color.into(),
        }),
        captured: entry.captured.map(|piece| BoardPiece {
            kind: piece.into(),
            color: (!entry.piece_color).into(),
        }),
        promotion: entry.promotion.map(Into::into),
        notation: Some(entry.notation.clone()),
    }
}

fn legal_move(mv: cozy_chess::Move) -> LegalMove {
    LegalMove {
        from: format_square(mv.from),
        to: format_square(mv.to),
        promotion: mv.promotion.map(Into::into),
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn backend(&self) -> BackendId {
        BackendId::Local
    }

    fn capabilities(&self) -> Capabilities {
        LOCAL_CAPABILITIES
    }

    async fn create_game(&self, options: CreateGameOptions) -> ClientResult<GameSnapshot> {
        let game = match &options.fen {
            Some(fen) => {
                Game::from_fen(fen).map_err(|e| ClientError::InvalidFen(e.to_string()))?
            }
            None => Game::new(),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let snapshot = Self::snapshot(&id, &game);
        self.games
            .lock()
            .unwrap()
            .insert(id.clone(), Arc::new(Mutex::new(game)));
        debug!(%id, "created local game");
        Ok(snapshot)
    }

    async fn get_game(&self, id: &str) -> ClientResult<GameSnapshot> {
        let game = self.game(id)?;
        let game = game.lock().unwrap();
        Ok(Self::snapshot(id, &game))
    }

    async fn delete_game(&self, id: &str) -> ClientResult<()> {
        self.games
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClientError::GameNotFound(id.to_string()))
    }

    async fn make_move(
        &self,
        id: &str,
        from: &str,
        to: &str,
        promotion: Option<char>,
    ) -> ClientResult<GameSnapshot> {
        let illegal = || ClientError::IllegalMove {
            from: from.to_string(),
            to: to.to_string(),
        };

        let from_square = parse_square(from).ok_or_else(illegal)?;
        let to_square = parse_square(to).ok_or_else(illegal)?;
        let promotion = match promotion {
            Some(c) => Some(parse_piece(c).ok_or_else(illegal)?),
            None => None,
        };

        let game = self.game(id)?;
        let mut game = game.lock().unwrap();
        let mv = game
            .find_legal_move(from_square, to_square, promotion)
            .ok_or_else(illegal)?;
        game.make_move(mv).map_err(|e| match e {
            GameError::IllegalMove { from, to } => ClientError::IllegalMove { from, to },
            other => ClientError::InvalidData(other.to_string()),
        })?;
        Ok(Self::snapshot(id, &game))
    }

    async fn undo_move(&self, id: &str) -> ClientResult<GameSnapshot> {
        let game = self.game(id)?;
        let mut game = game.lock().unwrap();
        game.undo().map_err(|_| ClientError::NothingToUndo)?;
        Ok(Self::snapshot(id, &game))
    }

    async fn legal_moves(&self, id: &str, from: Option<Square>) -> ClientResult<Vec<LegalMove>> {
        let game = self.game(id)?;
        let game = game.lock().unwrap();
        let moves = match from {
            Some(square) => game.legal_moves_from(square),
            None => game.legal_moves(),
        };
        Ok(moves.into_iter().map(legal_move).collect())
    }

    async fn ai_move(&self, id: &str, tier: Tier) -> ClientResult<AiMoveOutcome> {
        let game = self.game(id)?;
        let mut game = game.lock().unwrap();

        let started = Instant::now();
        let chosen = engine::compute_best_move(&mut game, tier);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mv = match chosen {
            Some(mv) => {
                let entry = game.make_move(mv).map_err(|e| match e {
                    GameError::IllegalMove { from, to } => ClientError::IllegalMove { from, to },
                    other => ClientError::InvalidData(other.to_string()),
                })?;
                Some(move_record(&entry))
            }
            // Terminal position: nothing to play, state is unchanged.
            None => None,
        };

        Ok(AiMoveOutcome {
            mv,
            state: Self::snapshot(id, &game),
            elapsed_ms,
            tier,
        })
    }

    async fn ai_hint(&self, id: &str, tier: Tier) -> ClientResult<Option<LegalMove>> {
        let game = self.game(id)?;
        let mut game = game.lock().unwrap();
        // The search reverts every probe, so the stored game is unchanged.
        Ok(engine::compute_best_move(&mut game, tier).map(legal_move))
    }

    async fn load_fen(&self, id: &str, fen: &str) -> ClientResult<GameSnapshot> {
        let replacement =
            Game::from_fen(fen).map_err(|e| ClientError::InvalidFen(e.to_string()))?;
        let game = self.game(id)?;
        let mut game = game.lock().unwrap();
        *game = replacement;
        Ok(Self::snapshot(id, &game))
    }

    async fn pgn(&self, _id: &str) -> ClientResult<String> {
        Err(ClientError::Unsupported {
            backend: "local",
            operation: "pgn",
        })
    }

    async fn analysis(&self, _id: &str, _depth: Option<u8>) -> ClientResult<RemoteAnalysis> {
        Err(ClientError::Unsupported {
            backend: "local",
            operation: "analysis",
        })
    }

    async fn health_check(&self) -> ClientResult<()> {
        Ok(())
    }

    async fn dispose(&self) {
        let count = {
            let mut games = self.games.lock().unwrap();
            let count = games.len();
            games.clear();
            count
        };
        debug!(count, "disposed local provider");
    }
}
