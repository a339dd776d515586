//! Per-backend JSON normalization.
//!
//! Each remote backend speaks its own JSON dialect: different field
//! casing, status vocabularies, piece encodings, and response envelopes.
//! An adapter is a pure mapping from one dialect into the canonical types;
//! it never performs I/O. Adapters tolerate missing or partial fields and
//! degrade to empty defaults instead of failing, since backends differ in
//! what they expose.

mod go_api;
mod js_api;
mod rust_api;

pub use go_api::GoApiAdapter;
pub use js_api::JsApiAdapter;
pub use rust_api::RustApiAdapter;

use chess::{GameResult, GameStatus, PieceColor, PieceKind};
use engine::Tier;
use serde_json::Value;

use crate::error::ClientResult;
use crate::types::{
    AiMoveOutcome, BackendId, BoardGrid, BoardPiece, Capabilities, CreateGameOptions,
    GameSnapshot, LegalMove, RemoteAnalysis,
};

/// Pure mapping bundle for one remote backend.
pub trait BackendAdapter: Send + Sync {
    fn backend(&self) -> BackendId;

    /// Path prefix for every game resource, e.g. "/api".
    fn api_prefix(&self) -> &'static str;

    /// Path of the connectivity probe, relative to the base URL.
    fn health_path(&self) -> &'static str;

    /// Name of the difficulty field in AI request bodies.
    fn difficulty_field(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Serialize create-game options into this backend's body vocabulary.
    fn create_game_body(&self, options: &CreateGameOptions) -> Value;

    fn norm_game(&self, raw: &Value) -> ClientResult<GameSnapshot>;

    fn norm_legal_moves(&self, raw: &Value) -> Vec<LegalMove>;

    fn norm_ai_move(&self, raw: &Value, tier: Tier) -> ClientResult<AiMoveOutcome>;

    fn norm_hint(&self, raw: &Value) -> Option<LegalMove>;

    fn norm_analysis(&self, raw: &Value) -> RemoteAnalysis;
}

/// Adapter for a backend id; `None` for the local backend, which needs no
/// JSON mapping.
pub fn adapter_for(backend: BackendId) -> Option<Box<dyn BackendAdapter>> {
    match backend {
        BackendId::Local => None,
        BackendId::Rust => Some(Box::new(RustApiAdapter)),
        BackendId::Go => Some(Box::new(GoApiAdapter)),
        BackendId::Js => Some(Box::new(JsApiAdapter)),
    }
}

/// Decode a piece from either encoding: a `{type, color}` object (the
/// structured form, preferred) or a single case-sensitive letter where
/// uppercase is White.
pub(crate) fn decode_piece(value: &Value) -> Option<BoardPiece> {
    if let Some(obj) = value.as_object() {
        let kind_str = obj
            .get("type")
            .or_else(|| obj.get("kind"))
            .and_then(Value::as_str)?;
        let kind = PieceKind::from_name(kind_str)
            .or_else(|| kind_str.chars().next().and_then(PieceKind::from_char))?;
        let color = obj
            .get("color")
            .and_then(Value::as_str)
            .and_then(PieceColor::from_str_loose)?;
        return Some(BoardPiece { kind, color });
    }

    let letter = value.as_str()?.chars().next()?;
    let kind = PieceKind::from_char(letter)?;
    let color = if letter.is_ascii_uppercase() {
        PieceColor::White
    } else {
        PieceColor::Black
    };
    Some(BoardPiece { kind, color })
}

/// Decode an 8x8 board sent 8th-rank-first (FEN row order) into the
/// canonical rank-1-first grid. Anything malformed degrades to `None`.
pub(crate) fn decode_board(value: &Value) -> Option<Box<BoardGrid>> {
    let rows = value.as_array()?;
    if rows.len() != 8 {
        return None;
    }

    let mut grid: BoardGrid = Default::default();
    for (row_idx, row) in rows.iter().enumerate() {
        let squares = row.as_array()?;
        if squares.len() != 8 {
            return None;
        }
        // Row 0 on the wire is the 8th rank.
        let rank_idx = 7 - row_idx;
        for (file_idx, square) in squares.iter().enumerate() {
            grid[rank_idx][file_idx] = decode_piece(square);
        }
    }
    Some(Box::new(grid))
}

/// Parse coordinate notation ("e2e4", "e7e8q") into a legal-move record.
pub(crate) fn decode_coordinate_move(s: &str) -> Option<LegalMove> {
    let mv = chess_common::parse_move(s)?;
    Some(LegalMove {
        from: chess_common::format_square(mv.from),
        to: chess_common::format_square(mv.to),
        promotion: mv.promotion.map(Into::into),
    })
}

/// Game ids arrive as strings or numbers depending on the backend.
pub(crate) fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Reconcile a backend-declared result with the mapped status. The
/// explicit result is trusted only when it agrees that the game is over;
/// otherwise the result is derived from the status and side to move, which
/// keeps `game_over` and `result` consistent by construction.
pub(crate) fn resolve_result(
    status: GameStatus,
    turn: PieceColor,
    explicit: Option<GameResult>,
) -> GameResult {
    match explicit {
        Some(result) if status.is_terminal() && result.is_decided() => result,
        _ => status.result_for_turn(turn),
    }
}
