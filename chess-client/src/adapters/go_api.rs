//! Adapter for the Go backend dialect.
//!
//! camelCase field names, terminal states spelled as winners
//! ("white_wins"/"black_wins"), single-letter piece codes, legal moves as
//! coordinate strings. This backend has no undo and no hint endpoint.

use chess::{GameResult, GameStatus, PieceColor};
use engine::Tier;
use serde::Deserialize;
use serde_json::Value;

use super::{
    decode_board, decode_coordinate_move, decode_piece, resolve_result, value_to_id,
    BackendAdapter,
};
use crate::error::{ClientError, ClientResult};
use crate::types::{
    AiMoveOutcome, AnalysisScore, BackendId, Capabilities, CreateGameOptions, GameSnapshot,
    LegalMove, MoveRecord, RemoteAnalysis,
};

pub struct GoApiAdapter;

const CAPABILITIES: Capabilities = Capabilities {
    undo: false,
    ai: true,
    hint: false,
    analysis: true,
    chat: false,
    websocket: false,
    pgn: true,
    fen_load: true,
};

/// Status table. This backend names the winner instead of the mate; the
/// canonical status for either winner string is checkmate, with the result
/// taken verbatim.
fn map_status(status: &str) -> (GameStatus, Option<GameResult>) {
    match status {
        "in_progress" | "check" => (GameStatus::Active, None),
        "white_wins" => (GameStatus::Checkmate, Some(GameResult::WhiteWins)),
        "black_wins" => (GameStatus::Checkmate, Some(GameResult::BlackWins)),
        "stalemate" => (GameStatus::Stalemate, None),
        "draw" => (GameStatus::Draw, None),
        _ => (GameStatus::Active, None),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GameDto {
    game_id: Value,
    fen: String,
    current_turn: String,
    status: String,
    in_check: bool,
    move_count: Option<usize>,
    move_history: Vec<HistoryDto>,
    board: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct HistoryDto {
    from: String,
    to: String,
    piece: String,
    captured: String,
    promotion: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegalMovesDto {
    legal_moves: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnalysisDto {
    depth: Option<u32>,
    /// Evaluation in pawns, side to move's perspective.
    evaluation: Option<f64>,
    mate_in: Option<i32>,
    best_move: Option<String>,
}

fn move_record(dto: &HistoryDto) -> MoveRecord {
    MoveRecord {
        from: dto.from.clone(),
        to: dto.to.clone(),
        piece: decode_piece(&Value::String(dto.piece.clone())),
        captured: decode_piece(&Value::String(dto.captured.clone())),
        promotion: dto
            .promotion
            .chars()
            .next()
            .and_then(chess::PieceKind::from_char),
        notation: None,
    }
}

impl BackendAdapter for GoApiAdapter {
    fn backend(&self) -> BackendId {
        BackendId::Go
    }

    fn api_prefix(&self) -> &'static str {
        "/api/v1"
    }

    fn health_path(&self) -> &'static str {
        "/api/v1/health"
    }

    fn difficulty_field(&self) -> &'static str {
        "aiDifficulty"
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    fn create_game_body(&self, options: &CreateGameOptions) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(fen) = &options.fen {
            body.insert("fen".to_string(), Value::from(fen.as_str()));
        }
        if let Some(white) = &options.white_player {
            body.insert("whitePlayer".to_string(), Value::from(white.as_str()));
        }
        if let Some(black) = &options.black_player {
            body.insert("blackPlayer".to_string(), Value::from(black.as_str()));
        }
        if options.ai_enabled {
            body.insert("aiEnabled".to_string(), Value::from(true));
            if let Some(tier) = options.ai_difficulty {
                body.insert("aiDifficulty".to_string(), Value::from(tier.as_str()));
            }
            if let Some(color) = options.ai_color {
                body.insert("aiColor".to_string(), Value::from(color.as_str()));
            }
        }
        Value::Object(body)
    }

    fn norm_game(&self, raw: &Value) -> ClientResult<GameSnapshot> {
        let dto: GameDto = serde_json::from_value(raw.clone())
            .map_err(|e| ClientError::InvalidData(format!("go game payload: {e}")))?;

        let turn = PieceColor::from_str_loose(&dto.current_turn).unwrap_or(PieceColor::White);
        let (status, declared) = map_status(&dto.status);
        let history: Vec<MoveRecord> = dto.move_history.iter().map(move_record).collect();

        Ok(GameSnapshot {
            id: value_to_id(&dto.game_id),
            fen: dto.fen,
            turn,
            status,
            check: dto.in_check || dto.status == "check",
            move_count: dto.move_count.unwrap_or(history.len()),
            history,
            board: decode_board(&dto.board),
            result: resolve_result(status, turn, declared),
            game_over: status.is_terminal(),
        })
    }

    fn norm_legal_moves(&self, raw: &Value) -> Vec<LegalMove> {
        serde_json::from_value::<LegalMovesDto>(raw.clone())
            .map(|dto| {
                dto.legal_moves
                    .iter()
                    .filter_map(|s| decode_coordinate_move(s))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn norm_ai_move(&self, raw: &Value, tier: Tier) -> ClientResult<AiMoveOutcome> {
        let state = self.norm_game(raw.get("game").unwrap_or(raw))?;
        let mv = raw
            .get("move")
            .and_then(Value::as_str)
            .and_then(decode_coordinate_move)
            .map(|mv| MoveRecord {
                from: mv.from,
                to: mv.to,
                promotion: mv.promotion,
                ..Default::default()
            });
        let elapsed_ms = raw
            .get("thinkingTimeMs")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(AiMoveOutcome {
            mv,
            state,
            elapsed_ms,
            tier,
        })
    }

    fn norm_hint(&self, _raw: &Value) -> Option<LegalMove> {
        // No hint endpoint; the capability flag keeps this unreachable.
        None
    }

    fn norm_analysis(&self, raw: &Value) -> RemoteAnalysis {
        let dto: AnalysisDto = serde_json::from_value(raw.clone()).unwrap_or_default();
        let score = match (dto.mate_in, dto.evaluation) {
            (Some(mate), _) => Some(AnalysisScore::Mate(mate)),
            (None, Some(pawns)) => Some(AnalysisScore::Centipawns((pawns * 100.0).round() as i32)),
            (None, None) => None,
        };
        RemoteAnalysis {
            depth: dto.depth,
            score,
            best_move: dto.best_move,
            pv: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::PieceKind;
    use serde_json::json;

    const DOCUMENTED_STATUSES: [&str; 6] = [
        "in_progress",
        "check",
        "white_wins",
        "black_wins",
        "stalemate",
        "draw",
    ];

    #[test]
    fn test_status_mapping_is_total() {
        for status in DOCUMENTED_STATUSES {
            let _ = map_status(status);
        }
        assert_eq!(
            map_status("white_wins"),
            (GameStatus::Checkmate, Some(GameResult::WhiteWins))
        );
        assert_eq!(
            map_status("black_wins"),
            (GameStatus::Checkmate, Some(GameResult::BlackWins))
        );
        assert_eq!(map_status("paused"), (GameStatus::Active, None));
    }

    #[test]
    fn test_game_over_iff_result_decided() {
        for status in DOCUMENTED_STATUSES {
            let snapshot = GoApiAdapter
                .norm_game(&json!({"gameId": 1, "fen": "x", "currentTurn": "w", "status": status}))
                .unwrap();
            assert_eq!(snapshot.game_over, snapshot.result.is_decided(), "{status}");
        }
    }

    #[test]
    fn test_winner_taken_from_status_not_turn() {
        // "white_wins" with White somehow still to move: the declared
        // winner is authoritative.
        let snapshot = GoApiAdapter
            .norm_game(&json!({
                "gameId": "7",
                "fen": "x",
                "currentTurn": "w",
                "status": "white_wins",
            }))
            .unwrap();
        assert_eq!(snapshot.result, GameResult::WhiteWins);
        assert_eq!(snapshot.status, GameStatus::Checkmate);
    }

    #[test]
    fn test_norm_game_letter_board_and_history() {
        let mut board = vec![vec![json!(""); 8]; 8];
        board[0][0] = json!("r");
        board[7][3] = json!("Q");

        let snapshot = GoApiAdapter
            .norm_game(&json!({
                "gameId": 3,
                "fen": "x",
                "currentTurn": "b",
                "status": "in_progress",
                "moveHistory": [
                    {"from": "d1", "to": "d8", "piece": "Q", "captured": "q"},
                ],
                "board": board,
            }))
            .unwrap();

        assert_eq!(snapshot.turn, PieceColor::Black);
        let grid = snapshot.board.unwrap();
        // Wire row 0 is the 8th rank.
        assert_eq!(grid[7][0].unwrap().kind, PieceKind::Rook);
        assert_eq!(grid[7][0].unwrap().color, PieceColor::Black);
        assert_eq!(grid[0][3].unwrap().kind, PieceKind::Queen);
        assert_eq!(grid[0][3].unwrap().color, PieceColor::White);

        let record = &snapshot.history[0];
        assert_eq!(record.piece.unwrap().color, PieceColor::White);
        assert_eq!(record.captured.unwrap().kind, PieceKind::Queen);
    }

    #[test]
    fn test_norm_legal_moves_coordinate_strings() {
        let moves = GoApiAdapter.norm_legal_moves(&json!({
            "legalMoves": ["e2e4", "e7e8q", "bogus"],
        }));
        // Unparseable entries are dropped, not fatal.
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].from, "e2");
        assert_eq!(moves[1].promotion, Some(PieceKind::Queen));
    }

    #[test]
    fn test_norm_ai_move_string_move() {
        let outcome = GoApiAdapter
            .norm_ai_move(
                &json!({
                    "move": "b8c6",
                    "game": {"gameId": 3, "fen": "x", "currentTurn": "w", "status": "in_progress"},
                    "thinkingTimeMs": 55,
                }),
                Tier::Medium,
            )
            .unwrap();
        let mv = outcome.mv.unwrap();
        assert_eq!((mv.from.as_str(), mv.to.as_str()), ("b8", "c6"));
        assert_eq!(outcome.elapsed_ms, 55);
    }

    #[test]
    fn test_norm_analysis_pawn_evaluation() {
        let analysis = GoApiAdapter.norm_analysis(&json!({
            "depth": 8,
            "evaluation": -1.25,
            "bestMove": "g8f6",
        }));
        assert_eq!(analysis.score, Some(AnalysisScore::Centipawns(-125)));
        assert_eq!(analysis.best_move.as_deref(), Some("g8f6"));

        let mate = GoApiAdapter.norm_analysis(&json!({"mateIn": -2}));
        assert_eq!(mate.score, Some(AnalysisScore::Mate(-2)));
    }
}
