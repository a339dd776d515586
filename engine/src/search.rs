//! Minimax search with alpha-beta pruning.
//!
//! The search explores the game tree destructively: every branch is entered
//! with `make_move` and left with the matching `undo`, including on pruning
//! exits, so the position observed by the caller is identical before and
//! after a search.

use std::time::Instant;

use chess::Game;
use cozy_chess::{Color, Move};
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::eval::{evaluate, piece_value};
use crate::Tier;

/// Search bound, strictly above any evaluation the leaf nodes can produce.
const INFINITY_SCORE: i32 = 10_000_000;

/// Root legal-move count above which deep searches are clamped.
const BRANCHING_THROTTLE: usize = 60;

/// Effective depth used when the throttle engages.
const THROTTLED_DEPTH: u8 = 3;

/// Pick a move for the side to move at the given strength tier.
///
/// Returns `None` when the position has no legal moves (a terminal
/// position); that is a normal outcome, not a failure. The game is left
/// in exactly the state it was passed in.
pub fn compute_best_move(game: &mut Game, tier: Tier) -> Option<Move> {
    let moves = ordered_moves(game);
    if moves.is_empty() {
        return None;
    }

    if tier.depth() == 0 {
        return moves.choose(&mut rand::rng()).copied();
    }

    let depth = effective_depth(tier, moves.len());
    let perspective = game.side_to_move();
    let started = Instant::now();
    let mut nodes: u64 = 0;

    let mut alpha = -INFINITY_SCORE;
    let mut best: Option<(Move, i32)> = None;

    for mv in moves {
        // A candidate the rules engine rejects is skipped, not fatal.
        if game.make_move(mv).is_err() {
            continue;
        }
        let score = search(game, depth - 1, alpha, INFINITY_SCORE, perspective, &mut nodes);
        // Cannot fail: a move was just applied on this branch.
        let _ = game.undo();

        if best.map_or(true, |(_, s)| score > s) {
            best = Some((mv, score));
        }
        alpha = alpha.max(score);
    }

    debug!(
        tier = %tier,
        depth,
        nodes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search complete"
    );

    best.map(|(mv, _)| mv)
}

/// Recursive minimax. Whether a node maximizes or minimizes follows the
/// actual side to move, not depth parity.
fn search(
    game: &mut Game,
    depth: u8,
    mut alpha: i32,
    mut beta: i32,
    perspective: Color,
    nodes: &mut u64,
) -> i32 {
    *nodes += 1;

    if depth == 0 {
        return evaluate(game, perspective);
    }

    let moves = ordered_moves(game);
    if moves.is_empty() {
        return evaluate(game, perspective);
    }

    let maximizing = game.side_to_move() == perspective;
    let mut best = if maximizing {
        -INFINITY_SCORE
    } else {
        INFINITY_SCORE
    };
    let mut explored = false;

    for mv in moves {
        if game.make_move(mv).is_err() {
            continue;
        }
        let score = search(game, depth - 1, alpha, beta, perspective, nodes);
        // Undo before any pruning exit so the branch is always reverted.
        let _ = game.undo();
        explored = true;

        if maximizing {
            best = best.max(score);
            alpha = alpha.max(best);
        } else {
            best = best.min(score);
            beta = beta.min(best);
        }
        if alpha >= beta {
            break;
        }
    }

    if !explored {
        return evaluate(game, perspective);
    }
    best
}

/// Clamp deep searches in pathologically branchy positions. Applies to a
/// single search call only; the tier itself is unchanged.
fn effective_depth(tier: Tier, branching: usize) -> u8 {
    let nominal = tier.depth();
    if branching > BRANCHING_THROTTLE && nominal > THROTTLED_DEPTH {
        THROTTLED_DEPTH
    } else {
        nominal
    }
}

/// Legal moves sorted captures-first by descending captured-piece value.
/// The sort is stable, so non-capturing moves keep their relative order.
fn ordered_moves(game: &Game) -> Vec<Move> {
    let mut moves = game.legal_moves();
    moves.sort_by_key(|mv| {
        std::cmp::Reverse(
            game.piece_at(mv.to)
                .map(|(piece, _)| piece_value(piece))
                .unwrap_or(0),
        )
    });
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_common::{format_move, parse_move};
    use std::collections::HashSet;

    const STALEMATE_FEN: &str = "7k/5Q2/5K2/8/8/8/8/8 b - - 0 1";

    #[test]
    fn test_terminal_position_returns_none_at_every_tier() {
        for tier in Tier::ALL {
            let mut game = Game::from_fen(STALEMATE_FEN).unwrap();
            assert_eq!(compute_best_move(&mut game, tier), None, "{tier}");
            assert_eq!(game.to_fen(), STALEMATE_FEN);
        }
    }

    #[test]
    fn test_harmless_tier_plays_random_legal_moves() {
        let mut game = Game::new();
        let legal: HashSet<String> = game
            .legal_moves()
            .into_iter()
            .map(format_move)
            .collect();

        let mut seen = HashSet::new();
        for _ in 0..20 {
            let mv = compute_best_move(&mut game, Tier::Harmless).unwrap();
            assert!(legal.contains(&format_move(mv)));
            seen.insert(format_move(mv));
        }
        // Uniform selection over 20 moves should not collapse to one.
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_search_preserves_position() {
        let midgame = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
        for tier in [Tier::Easy, Tier::Medium, Tier::Hard] {
            let mut game = Game::from_fen(midgame).unwrap();
            compute_best_move(&mut game, tier).unwrap();
            assert_eq!(game.to_fen(), midgame, "{tier}");
            assert_eq!(game.move_count(), 0);
        }
        // Deep tiers on a sparse position to keep the test quick.
        let sparse = "8/8/8/3k4/8/3K4/3Q4/8 w - - 0 1";
        for tier in [Tier::Expert, Tier::Godlike] {
            let mut game = Game::from_fen(sparse).unwrap();
            compute_best_move(&mut game, tier).unwrap();
            assert_eq!(game.to_fen(), sparse, "{tier}");
        }
    }

    #[test]
    fn test_medium_tier_takes_hanging_pawn() {
        // The queen on e2 can win the undefended e5 pawn outright.
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPQPPP/RNB1KBNR w KQkq - 0 1";
        let mut game = Game::from_fen(fen).unwrap();
        let mv = compute_best_move(&mut game, Tier::Medium).unwrap();
        assert_eq!(format_move(mv), "e2e5");
    }

    #[test]
    fn test_finds_back_rank_mate() {
        let fen = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1";
        let mut game = Game::from_fen(fen).unwrap();
        let mv = compute_best_move(&mut game, Tier::Medium).unwrap();
        assert_eq!(format_move(mv), "a1a8");
        game.make_move(mv).unwrap();
        assert!(game.is_game_over());
    }

    #[test]
    fn test_depth_throttle_clamps_only_deep_tiers() {
        assert_eq!(effective_depth(Tier::Godlike, 61), 3);
        assert_eq!(effective_depth(Tier::Expert, 61), 3);
        assert_eq!(effective_depth(Tier::Expert, 60), 4);
        assert_eq!(effective_depth(Tier::Hard, 200), 3);
        assert_eq!(effective_depth(Tier::Medium, 200), 2);
    }

    #[test]
    fn test_ordered_moves_put_best_capture_first() {
        // Both the black queen (d5) and a black pawn (h5) hang to white.
        let fen = "k7/8/8/3q3p/4P1P1/8/8/K7 w - - 0 1";
        let game = Game::from_fen(fen).unwrap();
        let moves = ordered_moves(&game);
        assert_eq!(format_move(moves[0]), "e4d5");
        assert_eq!(format_move(moves[1]), "g4h5");
        // Everything after the captures is quiet.
        assert!(moves[2..]
            .iter()
            .all(|mv| game.piece_at(mv.to).is_none()));
    }

    #[test]
    fn test_stale_move_is_rejected_not_fatal() {
        let mut game = Game::new();
        let stale = parse_move("e7e5").unwrap();
        assert!(game.make_move(stale).is_err());
        // Search still works after a rejected probe.
        assert!(compute_best_move(&mut game, Tier::Easy).is_some());
    }
}
