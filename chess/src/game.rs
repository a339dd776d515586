use std::collections::HashMap;

use chess_common::{format_move, format_square};
use cozy_chess::{Board, Color, Move, Piece, Square};

use crate::fen;
use crate::types::{GameResult, GameStatus};

/// Main game state wrapper around a cozy-chess Board.
///
/// Moves are applied with [`Game::make_move`] and reverted with
/// [`Game::undo`]; the two are exact inverses. Each history entry keeps a
/// snapshot of the pre-move board, so undo is O(1) and N undos after N
/// makes restore the original position bit for bit.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
    start_position: StartPosition,
    // Count of times each zobrist key has appeared, for repetition detection.
    position_counts: HashMap<u64, u32>,
}

/// One applied move plus everything needed to revert and describe it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub piece_color: Color,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    /// Coordinate notation, e.g. "e2e4" or "e7e8q".
    pub notation: String,
    /// FEN after this move was played.
    pub fen_after: String,
    previous: Board,
}

/// Starting position of the game.
#[derive(Debug, Clone)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl Game {
    /// Create a new game from the standard starting position.
    pub fn new() -> Self {
        Self::with_board(Board::default(), StartPosition::Standard)
    }

    /// Create a game from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = fen::parse_fen(fen)?;
        Ok(Self::with_board(position, StartPosition::Fen(fen.to_string())))
    }

    fn with_board(position: Board, start_position: StartPosition) -> Self {
        let mut position_counts = HashMap::new();
        position_counts.insert(position.hash(), 1);
        Self {
            position,
            history: Vec::new(),
            start_position,
            position_counts,
        }
    }

    /// The current board position.
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// The move history, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Number of half-moves played so far.
    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// The starting position this game was created from.
    pub fn start_position(&self) -> &StartPosition {
        &self.start_position
    }

    /// Apply a move. The move is validated against the current position, so
    /// a stale move generated from a different position is rejected rather
    /// than corrupting state.
    pub fn make_move(&mut self, mv: Move) -> Result<HistoryEntry, GameError> {
        if !self.legal_moves().contains(&mv) {
            return Err(GameError::IllegalMove {
                from: format_square(mv.from),
                to: format_square(mv.to),
            });
        }

        let piece = self
            .position
            .piece_on(mv.from)
            .ok_or_else(|| GameError::IllegalMove {
                from: format_square(mv.from),
                to: format_square(mv.to),
            })?;
        let piece_color = self.position.side_to_move();
        let captured = self.position.piece_on(mv.to);
        let previous = self.position.clone();

        self.position.play_unchecked(mv);
        *self.position_counts.entry(self.position.hash()).or_insert(0) += 1;

        let entry = HistoryEntry {
            mv,
            from: mv.from,
            to: mv.to,
            piece,
            piece_color,
            captured,
            promotion: mv.promotion,
            notation: format_move(mv),
            fen_after: self.to_fen(),
            previous,
        };
        self.history.push(entry.clone());

        Ok(entry)
    }

    /// Undo the most recent move, restoring the exact prior position.
    pub fn undo(&mut self) -> Result<(), GameError> {
        let entry = self.history.pop().ok_or(GameError::NothingToUndo)?;

        let leaving = self.position.hash();
        if let Some(count) = self.position_counts.get_mut(&leaving) {
            *count -= 1;
            if *count == 0 {
                self.position_counts.remove(&leaving);
            }
        }

        self.position = entry.previous;
        Ok(())
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Legal moves originating from one square.
    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        self.legal_moves()
            .into_iter()
            .filter(|mv| mv.from == from)
            .collect()
    }

    /// Find the legal move matching the given coordinates, if any.
    ///
    /// Castling arrives from clients in king-two-files form ("e1g1"), but
    /// the board encodes castling as king-onto-rook ("e1h1"); both spellings
    /// resolve to the same move here.
    pub fn find_legal_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Option<Move> {
        let legal = self.legal_moves();
        if let Some(mv) = legal
            .iter()
            .find(|m| m.from == from && m.to == to && m.promotion == promotion)
        {
            return Some(*mv);
        }

        if self.position.piece_on(from) == Some(Piece::King) && promotion.is_none() {
            let rook_file = match to.file() {
                cozy_chess::File::G => cozy_chess::File::H,
                cozy_chess::File::C => cozy_chess::File::A,
                _ => return None,
            };
            let rook_square = Square::new(rook_file, to.rank());
            return legal
                .iter()
                .find(|m| m.from == from && m.to == rook_square && m.promotion.is_none())
                .copied();
        }
        None
    }

    /// The side to move.
    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    /// Whether the side to move is currently in check.
    pub fn is_in_check(&self) -> bool {
        !self.position.checkers().is_empty()
    }

    /// Piece and color on a square, if any.
    pub fn piece_at(&self, square: Square) -> Option<(Piece, Color)> {
        let piece = self.position.piece_on(square)?;
        let color = self.position.color_on(square)?;
        Some((piece, color))
    }

    /// Current game status, including draw detection the board alone does
    /// not track (repetition is derived from the history of this game).
    pub fn status(&self) -> GameStatus {
        if self.legal_moves().is_empty() {
            return if self.is_in_check() {
                GameStatus::Checkmate
            } else {
                GameStatus::Stalemate
            };
        }
        if self.position.halfmove_clock() >= 100 {
            return GameStatus::FiftyMoveRule;
        }
        if self
            .position_counts
            .get(&self.position.hash())
            .copied()
            .unwrap_or(0)
            >= 3
        {
            return GameStatus::ThreefoldRepetition;
        }
        if insufficient_material(&self.position) {
            return GameStatus::InsufficientMaterial;
        }
        GameStatus::Active
    }

    /// True once the game has reached any terminal status.
    pub fn is_game_over(&self) -> bool {
        self.status().is_terminal()
    }

    /// Result of the game ("*" while still running).
    pub fn result(&self) -> GameResult {
        self.status().result_for_turn(self.side_to_move().into())
    }

    /// Export the position to FEN.
    pub fn to_fen(&self) -> String {
        fen::format_fen(&self.position)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Neither side can force mate: bare kings, or a lone minor piece, or
/// bishops all confined to one square color.
fn insufficient_material(board: &Board) -> bool {
    let kings = board.pieces(Piece::King);
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    let heavy = board.occupied() ^ kings ^ knights ^ bishops;

    if !heavy.is_empty() {
        return false;
    }

    match (knights.len(), bishops.len()) {
        (0, 0) => true,
        (1, 0) => true,
        (0, _) => {
            let mut parities = bishops.into_iter().map(square_color_parity);
            let first = parities.next();
            parities.all(|p| Some(p) == first)
        }
        _ => false,
    }
}

fn square_color_parity(square: Square) -> u8 {
    ((square.file() as u8) + (square.rank() as u8)) % 2
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("illegal move: {from} -> {to}")]
    IllegalMove { from: String, to: String },
    #[error("nothing to undo")]
    NothingToUndo,
    #[error(transparent)]
    Fen(#[from] fen::FenError),
}
