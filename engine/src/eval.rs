//! Static evaluation: material count with a decisive override for mate.

use chess::{Game, GameStatus};
use cozy_chess::{Board, Color, Piece};

/// Score assigned to a delivered checkmate, far outside any material sum.
pub const MATE_SCORE: i32 = 1_000_000;

/// Standard material value of a piece, in centipawns.
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 300,
        Piece::Bishop => 300,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 10_000,
    }
}

/// Material sum from `perspective`: own pieces count positive, the
/// opponent's negative.
pub fn material_balance(board: &Board, perspective: Color) -> i32 {
    let mut score = 0;
    for piece in Piece::ALL {
        let value = piece_value(piece);
        let own = (board.pieces(piece) & board.colors(perspective)).len() as i32;
        let theirs = (board.pieces(piece) & board.colors(!perspective)).len() as i32;
        score += value * (own - theirs);
    }
    score
}

/// Evaluate the current position from `perspective`. Checkmate overrides
/// the material sum with a decisive score for the side that delivered it;
/// every other status (including drawn terminals) is just the material
/// count.
pub fn evaluate(game: &Game, perspective: Color) -> i32 {
    if game.status() == GameStatus::Checkmate {
        // The side to move is the side that got mated.
        return if game.side_to_move() == perspective {
            -MATE_SCORE
        } else {
            MATE_SCORE
        };
    }
    material_balance(game.position(), perspective)
}
