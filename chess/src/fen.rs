use cozy_chess::Board;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fen = fen.trim();
    if fen.split_whitespace().count() != 6 {
        return Err(FenError::InvalidFormat);
    }
    fen.parse().map_err(|_| FenError::InvalidPosition)
}

/// Format a Board as a FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("FEN must have six whitespace-separated fields")]
    InvalidFormat,
    #[error("FEN does not describe a valid position")]
    InvalidPosition,
}
