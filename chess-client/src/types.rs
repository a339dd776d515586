//! Canonical, backend-agnostic game-state types.
//!
//! Every provider, local or remote, resolves to these shapes, so the
//! rest of the application never sees a backend's native JSON vocabulary.

use std::collections::HashMap;

use chess::{GameResult, GameStatus, PieceColor, PieceKind};
use engine::Tier;
use serde::{Deserialize, Serialize};

/// The closed set of selectable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// In-process rules engine, no network dependency.
    Local,
    Rust,
    Go,
    Js,
}

impl BackendId {
    pub const ALL: [BackendId; 4] = [
        BackendId::Local,
        BackendId::Rust,
        BackendId::Go,
        BackendId::Js,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Js => "js",
        }
    }

    /// Human-readable name for status lines and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Local => "Local engine",
            Self::Rust => "Rust API",
            Self::Go => "Go API",
            Self::Js => "JS API",
        }
    }

    /// Built-in base URL for remote backends, overridable per backend.
    pub fn default_url(self) -> Option<&'static str> {
        match self {
            Self::Local => None,
            Self::Rust => Some("http://localhost:8000"),
            Self::Go => Some("http://localhost:8080"),
            Self::Js => Some("http://localhost:3001"),
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl std::str::FromStr for BackendId {
    type Err = UnknownBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "rust" => Ok(Self::Rust),
            "go" => Ok(Self::Go),
            "js" => Ok(Self::Js),
            _ => Err(UnknownBackendError(s.to_string())),
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown backend: {0}")]
pub struct UnknownBackendError(String);

/// What a backend supports. Declared once at provider construction and
/// never mutated; callers check before invoking the matching operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub undo: bool,
    pub ai: bool,
    pub hint: bool,
    pub analysis: bool,
    pub chat: bool,
    pub websocket: bool,
    pub pgn: bool,
    pub fen_load: bool,
}

/// A piece on the canonical board grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPiece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

/// 8x8 board indexed `[rank][file]` with rank 0 = rank 1 (White's back
/// rank). `None` is an empty square.
pub type BoardGrid = [[Option<BoardPiece>; 8]; 8];

/// Canonical snapshot of one game, regardless of which backend produced it.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub id: String,
    pub fen: String,
    pub turn: PieceColor,
    pub status: GameStatus,
    pub check: bool,
    pub move_count: usize,
    pub history: Vec<MoveRecord>,
    /// Not every backend exposes a machine-readable board.
    pub board: Option<Box<BoardGrid>>,
    pub result: GameResult,
    pub game_over: bool,
}

/// One half-move as the canonical model records it. Remote histories can
/// be sparse, so everything beyond the coordinates is optional.
#[derive(Debug, Clone, Default)]
pub struct MoveRecord {
    pub from: String,
    pub to: String,
    pub piece: Option<BoardPiece>,
    pub captured: Option<BoardPiece>,
    pub promotion: Option<PieceKind>,
    /// Whatever textual form the source records (coordinate pairs locally,
    /// SAN on backends that produce it).
    pub notation: Option<String>,
}

/// A legal move offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<PieceKind>,
}

/// Result of asking a provider to play for the artificial opponent.
#[derive(Debug, Clone)]
pub struct AiMoveOutcome {
    /// `None` when the position was already terminal.
    pub mv: Option<MoveRecord>,
    pub state: GameSnapshot,
    pub elapsed_ms: u64,
    pub tier: Tier,
}

/// Position evaluation from a backend's analysis service.
#[derive(Debug, Clone, Default)]
pub struct RemoteAnalysis {
    pub depth: Option<u32>,
    pub score: Option<AnalysisScore>,
    pub best_move: Option<String>,
    /// Principal variation in coordinate notation.
    pub pv: Vec<String>,
}

/// Evaluation score, from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
}

impl std::fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", f64::from(*cp) / 100.0),
            Self::Mate(m) if *m >= 0 => write!(f, "+M{m}"),
            Self::Mate(m) => write!(f, "-M{}", m.abs()),
        }
    }
}

/// Options for creating a game. Remote backends receive the AI fields in
/// their own field-name conventions; the local provider ignores them (the
/// session drives the artificial opponent itself).
#[derive(Debug, Clone, Default)]
pub struct CreateGameOptions {
    pub fen: Option<String>,
    pub white_player: Option<String>,
    pub black_player: Option<String>,
    pub ai_enabled: bool,
    pub ai_difficulty: Option<Tier>,
    pub ai_color: Option<PieceColor>,
}

/// Durable selector state: the persisted backend choice plus per-backend
/// URL overrides. An external persistence layer loads and saves this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSettings {
    pub active: BackendId,
    #[serde(default)]
    pub url_overrides: HashMap<BackendId, String>,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            active: BackendId::Local,
            url_overrides: HashMap::new(),
        }
    }
}
