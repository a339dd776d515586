//! Adapter for the Rust backend dialect.
//!
//! snake_case fields, full status vocabulary, structured `{type, color}`
//! piece objects, and a board sent as 8 rows of piece objects.

use chess::{GameStatus, PieceColor, PieceKind};
use engine::Tier;
use serde::Deserialize;
use serde_json::Value;

use super::{
    decode_board, decode_piece, resolve_result, value_to_id, BackendAdapter,
};
use crate::error::{ClientError, ClientResult};
use crate::types::{
    AiMoveOutcome, BackendId, Capabilities, CreateGameOptions, GameSnapshot, LegalMove,
    MoveRecord, RemoteAnalysis,
};

pub struct RustApiAdapter;

const CAPABILITIES: Capabilities = Capabilities {
    undo: true,
    ai: true,
    hint: true,
    analysis: true,
    chat: false,
    websocket: true,
    pgn: true,
    fen_load: true,
};

/// Every status string this backend documents. Anything else maps to an
/// active game.
fn map_status(status: &str) -> GameStatus {
    match status {
        "active" | "check" => GameStatus::Active,
        "checkmate" => GameStatus::Checkmate,
        "stalemate" => GameStatus::Stalemate,
        "draw" => GameStatus::Draw,
        "insufficient_material" => GameStatus::InsufficientMaterial,
        "threefold_repetition" => GameStatus::ThreefoldRepetition,
        "fifty_move_rule" => GameStatus::FiftyMoveRule,
        _ => GameStatus::Active,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GameDto {
    id: Value,
    fen: String,
    turn: String,
    status: String,
    in_check: bool,
    move_count: Option<usize>,
    history: Vec<MoveDto>,
    board: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MoveDto {
    from: String,
    to: String,
    piece: Value,
    captured: Value,
    promotion: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegalMovesDto {
    moves: Vec<MoveDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisDto {
    depth: Option<u32>,
    score_cp: Option<i32>,
    mate_in: Option<i32>,
    best_move: Option<String>,
    pv: Vec<String>,
}

fn move_record(dto: &MoveDto) -> MoveRecord {
    MoveRecord {
        from: dto.from.clone(),
        to: dto.to.clone(),
        piece: decode_piece(&dto.piece),
        captured: decode_piece(&dto.captured),
        promotion: promotion_kind(dto.promotion.as_deref()),
        notation: None,
    }
}

fn legal_move(dto: &MoveDto) -> LegalMove {
    LegalMove {
        from: dto.from.clone(),
        to: dto.to.clone(),
        promotion: promotion_kind(dto.promotion.as_deref()),
    }
}

fn promotion_kind(promotion: Option<&str>) -> Option<PieceKind> {
    let s = promotion?;
    PieceKind::from_name(s).or_else(|| s.chars().next().and_then(PieceKind::from_char))
}

impl BackendAdapter for RustApiAdapter {
    fn backend(&self) -> BackendId {
        BackendId::Rust
    }

    fn api_prefix(&self) -> &'static str {
        "/api"
    }

    fn health_path(&self) -> &'static str {
        "/api/health"
    }

    fn difficulty_field(&self) -> &'static str {
        "difficulty"
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
            body.insert("white_player".to_string(), Value::from(white.as_str()));
        }
        if let Some(black) = &options.black_player {
            body.insert("black_player".to_string(), Value::from(black.as_str()));
        }
        if options.ai_enabled {
            body.insert("ai_enabled".to_string(), Value::from(true));
            if let Some(tier) = options.ai_difficulty {
                body.insert("ai_difficulty".to_string(), Value::from(tier.as_str()));
            }
            if let Some(color) = options.ai_color {
                body.insert("ai_color".to_string(), Value::from(color.as_str()));
            }
        }
        Value::Object(body)
    }

    fn norm_game(&self, raw: &Value) -> ClientResult<GameSnapshot> {
        let dto: GameDto = serde_json::from_value(raw.clone())
            .map_err(|e| ClientError::InvalidData(format!("rust game payload: {e}")))?;

        let turn = PieceColor::from_str_loose(&dto.turn).unwrap_or(PieceColor::White);
        let status = map_status(&dto.status);
        let history: Vec<MoveRecord> = dto.history.iter().map(move_record).collect();

        Ok(GameSnapshot {
            id: value_to_id(&dto.id),
            fen: dto.fen,
            turn,
            status,
            check: dto.in_check || dto.status == "check",
            move_count: dto.move_count.unwrap_or(history.len()),
            history,
            board: decode_board(&dto.board),
            result: resolve_result(status, turn, None),
            game_over: status.is_terminal(),
        })
    }

    fn norm_legal_moves(&self, raw: &Value) -> Vec<LegalMove> {
        serde_json::from_value::<LegalMovesDto>(raw.clone())
            .map(|dto| dto.moves.iter().map(legal_move).collect())
            .unwrap_or_default()
    }

    fn norm_ai_move(&self, raw: &Value, tier: Tier) -> ClientResult<AiMoveOutcome> {
        let state = self.norm_game(raw.get("game").unwrap_or(raw))?;
        let mv = raw
            .get("move")
            .and_then(|v| serde_json::from_value::<MoveDto>(v.clone()).ok())
            .filter(|dto| !dto.from.is_empty())
            .map(|dto| move_record(&dto));
        let elapsed_ms = raw.get("elapsed_ms").and_then(Value::as_u64).unwrap_or(0);

        Ok(AiMoveOutcome {
            mv,
            state,
            elapsed_ms,
            tier,
        })
    }

    fn norm_hint(&self, raw: &Value) -> Option<LegalMove> {
        let dto: MoveDto = serde_json::from_value(raw.get("move")?.clone()).ok()?;
        if dto.from.is_empty() {
            return None;
        }
        Some(legal_move(&dto))
    }

    fn norm_analysis(&self, raw: &Value) -> RemoteAnalysis {
        let dto: AnalysisDto = serde_json::from_value(raw.clone()).unwrap_or_default();
        let score = match (dto.mate_in, dto.score_cp) {
            (Some(mate), _) => Some(crate::types::AnalysisScore::Mate(mate)),
            (None, Some(cp)) => Some(crate::types::AnalysisScore::Centipawns(cp)),
            (None, None) => None,
        };
        RemoteAnalysis {
            depth: dto.depth,
            score,
            best_move: dto.best_move,
            pv: dto.pv,
        }
    }
}
