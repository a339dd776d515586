pub mod fen;
pub mod game;
pub mod types;

pub use fen::{format_fen, parse_fen, FenError, STARTING_FEN};
pub use game::{Game, GameError, HistoryEntry, StartPosition};
pub use types::{GameResult, GameStatus, PieceColor, PieceKind};
