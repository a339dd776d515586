//! Adapter for the JS backend dialect.
//!
//! snake_case fields, a small status vocabulary where "checkmate" leaves
//! the winner to be inferred from whose turn it is, SAN in the move
//! history, and no machine-readable board at all.

use chess::{GameResult, GameStatus, PieceColor, PieceKind};
use engine::Tier;
use serde::Deserialize;
use serde_json::Value;

use super::{resolve_result, value_to_id, BackendAdapter};
use crate::error::{ClientError, ClientResult};
use crate::types::{
    AiMoveOutcome, BackendId, Capabilities, CreateGameOptions, GameSnapshot, LegalMove,
    MoveRecord, RemoteAnalysis,
};

pub struct JsApiAdapter;

const CAPABILITIES: Capabilities = Capabilities {
    undo: true,
    ai: true,
    hint: true,
    analysis: false,
    chat: true,
    websocket: false,
    pgn: true,
    fen_load: false,
};

fn map_status(status: &str) -> GameStatus {
    match status {
        "ongoing" | "active" => GameStatus::Active,
        "checkmate" => GameStatus::Checkmate,
        "stalemate" => GameStatus::Stalemate,
        "draw" => GameStatus::Draw,
        _ => GameStatus::Active,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GameDto {
    game_id: Value,
    fen: String,
    turn: String,
    status: String,
    check: bool,
    moves: Vec<MoveDto>,
    result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MoveDto {
    from: String,
    to: String,
    promotion: Option<String>,
    san: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegalMovesDto {
    moves: Vec<MoveDto>,
}

fn promotion_kind(promotion: Option<&str>) -> Option<PieceKind> {
    promotion?.chars().next().and_then(PieceKind::from_char)
}

fn move_record(dto: &MoveDto) -> MoveRecord {
    MoveRecord {
        from: dto.from.clone(),
        to: dto.to.clone(),
        piece: None,
        captured: None,
        promotion: promotion_kind(dto.promotion.as_deref()),
        notation: dto.san.clone(),
    }
}

fn legal_move(dto: &MoveDto) -> LegalMove {
    LegalMove {
        from: dto.from.clone(),
        to: dto.to.clone(),
        promotion: promotion_kind(dto.promotion.as_deref()),
    }
}

impl BackendAdapter for JsApiAdapter {
    fn backend(&self) -> BackendId {
        BackendId::Js
    }

    fn api_prefix(&self) -> &'static str {
        ""
    }

    fn health_path(&self) -> &'static str {
        "/health"
    }

    fn difficulty_field(&self) -> &'static str {
        "level"
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
                body.insert("level".to_string(), Value::from(tier.as_str()));
            }
            if let Some(color) = options.ai_color {
                body.insert("ai_color".to_string(), Value::from(color.as_str()));
            }
        }
        Value::Object(body)
    }

    fn norm_game(&self, raw: &Value) -> ClientResult<GameSnapshot> {
        let dto: GameDto = serde_json::from_value(raw.clone())
            .map_err(|e| ClientError::InvalidData(format!("js game payload: {e}")))?;

        let turn = PieceColor::from_str_loose(&dto.turn).unwrap_or(PieceColor::White);
        let status = map_status(&dto.status);
        let declared = dto.result.as_deref().and_then(GameResult::from_str_loose);
        let history: Vec<MoveRecord> = dto.moves.iter().map(move_record).collect();

        Ok(GameSnapshot {
            id: value_to_id(&dto.game_id),
            fen: dto.fen,
            turn,
            status,
            check: dto.check,
            move_count: history.len(),
            history,
            // This backend never exposes a board grid.
            board: None,
            result: resolve_result(status, turn, declared),
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
        let elapsed_ms = raw.get("time_ms").and_then(Value::as_u64).unwrap_or(0);

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

    fn norm_analysis(&self, _raw: &Value) -> RemoteAnalysis {
        // No analysis service; the capability flag keeps this unreachable.
        RemoteAnalysis::default()
    }
}
